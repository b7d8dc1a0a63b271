//! Invite code query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::InviteCodes;

/// Column order for `invite_from_row()`.
fn invite_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            InviteCodes::Code,
            InviteCodes::OwnerId,
            InviteCodes::CreatedAt,
            InviteCodes::ExpiresAt,
            InviteCodes::UsedAt,
            InviteCodes::UsedBy,
        ])
        .from(InviteCodes::Table)
        .to_owned()
}

pub fn get(code: &str) -> Built {
    invite_select()
        .and_where(Expr::col(InviteCodes::Code).eq(code))
        .build(SqliteQueryBuilder)
}

/// The owner's newest unused code that has not expired at `now`.
pub fn find_active_for_owner(owner_id: &str, now: &str) -> Built {
    invite_select()
        .and_where(Expr::col(InviteCodes::OwnerId).eq(owner_id))
        .and_where(Expr::col(InviteCodes::UsedAt).is_null())
        .and_where(Expr::col(InviteCodes::ExpiresAt).gte(now))
        .order_by(InviteCodes::CreatedAt, Order::Desc)
        .limit(1)
        .build(SqliteQueryBuilder)
}

pub fn insert(code: &str, owner_id: &str, created_at: &str, expires_at: &str) -> Built {
    Query::insert()
        .into_table(InviteCodes::Table)
        .columns([
            InviteCodes::Code,
            InviteCodes::OwnerId,
            InviteCodes::CreatedAt,
            InviteCodes::ExpiresAt,
        ])
        .values_panic([
            code.into(),
            owner_id.into(),
            created_at.into(),
            expires_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Consume a code. Matches zero rows unless the code is still unused,
/// unexpired at `now` and owned by someone other than `used_by`.
pub fn mark_used(code: &str, used_by: &str, now: &str) -> Built {
    Query::update()
        .table(InviteCodes::Table)
        .value(InviteCodes::UsedAt, now)
        .value(InviteCodes::UsedBy, used_by)
        .and_where(Expr::col(InviteCodes::Code).eq(code))
        .and_where(Expr::col(InviteCodes::UsedAt).is_null())
        .and_where(Expr::col(InviteCodes::ExpiresAt).gte(now))
        .and_where(Expr::col(InviteCodes::OwnerId).ne(used_by))
        .build(SqliteQueryBuilder)
}
