//! User directory: registration, API-key resolution, profile updates.

use chrono::{DateTime, Utc};
use tethered_api::crypto::{generate_api_key, hash_token};
use tethered_api::db::users;
use tethered_core::time::format_ts;
use tethered_core::{Error, Result, UserRole, UserSummary};

use crate::db::{Db, is_unique_violation, sq_execute, sq_query_row, user_from_row};

/// A freshly registered user and the only copy of their API key.
#[derive(Debug)]
pub struct Registration {
    pub user: UserSummary,
    pub api_key: String,
}

#[derive(Clone)]
pub struct UserDirectory {
    db: Db,
}

impl UserDirectory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn register(&self, name: &str, role: UserRole, now: DateTime<Utc>) -> Result<Registration> {
        let id = uuid::Uuid::new_v4().to_string();
        let api_key = generate_api_key().map_err(|e| Error::Store(e.message()))?;
        let conn = self.db.conn();
        sq_execute(
            &conn,
            users::insert(&id, name, role.as_str(), &hash_token(&api_key), &format_ts(now)),
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Store("api key collision".into())
            } else {
                Error::store("insert user")(e)
            }
        })?;
        tracing::info!(user_id = %id, role = %role, "registered user");
        Ok(Registration {
            user: UserSummary {
                id,
                name: name.to_string(),
                role,
                avatar_url: None,
            },
            api_key,
        })
    }

    /// Resolve a bearer key to its user. Unknown keys yield `None`.
    pub fn resolve_api_key(&self, api_key: &str) -> Result<Option<UserSummary>> {
        let conn = self.db.conn();
        sq_query_row(&conn, users::get_by_api_key_hash(&hash_token(api_key)), user_from_row)
            .map_err(Error::store("resolve api key"))
    }

    pub fn get(&self, user_id: &str) -> Result<Option<UserSummary>> {
        let conn = self.db.conn();
        sq_query_row(&conn, users::get_by_id(user_id), user_from_row)
            .map_err(Error::store("get user"))
    }

    /// Apply the given changes and return the updated profile.
    /// `avatar_url: Some(None)` clears the avatar.
    pub fn update_profile(
        &self,
        user_id: &str,
        name: Option<&str>,
        avatar_url: Option<Option<&str>>,
        now: DateTime<Utc>,
    ) -> Result<UserSummary> {
        let now = format_ts(now);
        self.db.write(|tx| {
            if let Some(name) = name {
                sq_execute(tx, users::update_name(user_id, name, &now))
                    .map_err(Error::store("update name"))?;
            }
            if let Some(avatar_url) = avatar_url {
                sq_execute(tx, users::update_avatar(user_id, avatar_url, &now))
                    .map_err(Error::store("update avatar"))?;
            }
            sq_query_row(tx, users::get_by_id(user_id), user_from_row)
                .map_err(Error::store("get user"))?
                .ok_or(Error::NotFound("user"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;
    use tethered_core::testing::at;

    fn directory() -> (tempfile::TempDir, UserDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        (dir, UserDirectory::new(db))
    }

    #[test]
    fn api_key_resolves_to_user() {
        let (_dir, users) = directory();
        let reg = users
            .register("Mina", UserRole::Student, at("2024-01-01 08:00:00"))
            .unwrap();
        let found = users.resolve_api_key(&reg.api_key).unwrap().unwrap();
        assert_eq!(found, reg.user);
        assert!(users.resolve_api_key("tsk_nope").unwrap().is_none());
    }

    #[test]
    fn update_profile_changes_only_given_fields() {
        let (_dir, users) = directory();
        let reg = users
            .register("Mina", UserRole::Parent, at("2024-01-01 08:00:00"))
            .unwrap();
        let now = at("2024-01-02 08:00:00");
        let updated = users
            .update_profile(&reg.user.id, None, Some(Some("https://cdn.example/a.png")), now)
            .unwrap();
        assert_eq!(updated.name, "Mina");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example/a.png"));

        let cleared = users
            .update_profile(&reg.user.id, Some("Mom"), Some(None), now)
            .unwrap();
        assert_eq!(cleared.name, "Mom");
        assert_eq!(cleared.avatar_url, None);
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let (_dir, users) = directory();
        let err = users
            .update_profile("ghost", Some("x"), None, at("2024-01-01 00:00:00"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("user")));
    }
}
