//! User / auth query builders.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Users;

/// Column order for `user_from_row()`: id, name, user_type, avatar_url.
fn summary_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([Users::Id, Users::Name, Users::UserType, Users::AvatarUrl])
        .from(Users::Table)
        .to_owned()
}

/// Find user by id.
pub fn get_by_id(user_id: &str) -> Built {
    summary_select()
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Resolve an API key hash to its user.
pub fn get_by_api_key_hash(key_hash: &str) -> Built {
    summary_select()
        .and_where(Expr::col(Users::ApiKeyHash).eq(key_hash))
        .build(SqliteQueryBuilder)
}

pub fn insert(id: &str, name: &str, user_type: &str, api_key_hash: &str, now: &str) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Name,
            Users::UserType,
            Users::ApiKeyHash,
            Users::CreatedAt,
            Users::UpdatedAt,
        ])
        .values_panic([
            id.into(),
            name.into(),
            user_type.into(),
            api_key_hash.into(),
            now.into(),
            now.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn update_name(user_id: &str, name: &str, now: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::Name, name)
        .value(Users::UpdatedAt, now)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Set or clear the avatar URL.
pub fn update_avatar(user_id: &str, avatar_url: Option<&str>, now: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::AvatarUrl, avatar_url.map(str::to_string))
        .value(Users::UpdatedAt, now)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_hash_binds_value() {
        let (sql, values) = get_by_api_key_hash("abc");
        assert!(sql.contains(r#""api_key_hash" = ?"#));
        assert_eq!(values.0.len(), 1);
    }
}
