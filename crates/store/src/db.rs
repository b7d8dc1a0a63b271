use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tethered_api::db::Built;
use tethered_api::db::migrations::MIGRATIONS;
use tethered_core::time::{parse_day, parse_ts};
use tethered_core::{
    Error, FamilyConnection, Interaction, InteractionKind, InviteCode, Streak, UserRole,
    UserSummary,
};

/// Where the store keeps its files.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub file_name: String,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: "tethered.db".to_string(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

/// Shared database handle. Cloning shares the same connection.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
}

impl Db {
    /// Open (or create) the database, enable WAL, and run migrations.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("create data dir {}", config.data_dir.display()))?;
        let path = config.db_path();
        let conn = Connection::open(&path)
            .with_context(|| format!("opening SQLite database {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Writers on other handles wait instead of failing with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            data_dir: config.data_dir.clone(),
        })
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Root directory for locally stored blobs.
    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    /// Run `f` inside an immediate (write-locked) transaction.
    /// Commits on `Ok`, rolls back on `Err`.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> tethered_core::Result<T>) -> tethered_core::Result<T> {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::store("begin transaction"))?;
        let out = f(&tx)?;
        tx.commit().map_err(Error::store("commit transaction"))?;
        Ok(out)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

// ── sea-query bridge ───────────────────────────────────────────────────────

fn to_sql_values(values: &sea_query::Values) -> Vec<SqlValue> {
    use sea_query::Value;
    values
        .0
        .iter()
        .map(|v| match v {
            Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            Value::TinyInt(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::SmallInt(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::Int(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::BigInt(Some(n)) => SqlValue::Integer(*n),
            Value::TinyUnsigned(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::SmallUnsigned(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::Unsigned(Some(n)) => SqlValue::Integer(i64::from(*n)),
            Value::BigUnsigned(Some(n)) => SqlValue::Integer(i64::try_from(*n).unwrap_or(i64::MAX)),
            Value::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            Value::Double(Some(f)) => SqlValue::Real(*f),
            Value::String(Some(s)) => SqlValue::Text(s.to_string()),
            Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
            Value::Bytes(Some(b)) => SqlValue::Blob(b.to_vec()),
            _ => SqlValue::Null,
        })
        .collect()
}

/// Execute a built statement, returning the affected row count.
pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, rusqlite::params_from_iter(to_sql_values(&values)))
}

/// Fetch at most one row.
pub fn sq_query_row<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    conn.query_row(&sql, rusqlite::params_from_iter(to_sql_values(&values)), f)
        .optional()
}

/// Fetch every row.
pub fn sq_query_map<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(to_sql_values(&values)), f)?;
    rows.collect()
}

/// Primary-key or UNIQUE constraint failure.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ── Row mappers ────────────────────────────────────────────────────────────

fn bad_column(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected stored value {raw:?}").into(),
    )
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| bad_column(idx, &raw))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(&r).ok_or_else(|| bad_column(idx, &r)))
        .transpose()
}

fn day_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_day(&raw).ok_or_else(|| bad_column(idx, &raw))
}

fn opt_day_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_day(&r).ok_or_else(|| bad_column(idx, &r)))
        .transpose()
}

fn count_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let n: i64 = row.get(idx)?;
    u32::try_from(n).map_err(|_| bad_column(idx, &n.to_string()))
}

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserSummary> {
    let role: String = row.get(2)?;
    Ok(UserSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        role: UserRole::parse(&role).ok_or_else(|| bad_column(2, &role))?,
        avatar_url: row.get(3)?,
    })
}

pub fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<InviteCode> {
    Ok(InviteCode {
        code: row.get(0)?,
        owner_id: row.get(1)?,
        created_at: ts_col(row, 2)?,
        expires_at: ts_col(row, 3)?,
        used_at: opt_ts_col(row, 4)?,
        used_by: row.get(5)?,
    })
}

pub fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<FamilyConnection> {
    Ok(FamilyConnection {
        id: row.get(0)?,
        party_a: row.get(1)?,
        party_b: row.get(2)?,
        connected_at: ts_col(row, 3)?,
    })
}

pub fn streak_from_row(row: &Row<'_>) -> rusqlite::Result<Streak> {
    Ok(Streak {
        connection_id: row.get(0)?,
        current_streak_days: count_col(row, 1)?,
        longest_streak_days: count_col(row, 2)?,
        last_interaction_date: opt_day_col(row, 3)?,
        last_interaction_at: opt_ts_col(row, 4)?,
        updated_at: ts_col(row, 5)?,
    })
}

pub fn interaction_from_row(row: &Row<'_>) -> rusqlite::Result<Interaction> {
    let kind: String = row.get(3)?;
    Ok(Interaction {
        id: row.get(0)?,
        connection_id: row.get(1)?,
        user_id: row.get(2)?,
        kind: InteractionKind::parse(&kind).ok_or_else(|| bad_column(3, &kind))?,
        day: day_col(row, 4)?,
        occurred_at: ts_col(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_twice_applies_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let first = Db::open(&config).unwrap();
        drop(first);
        let db = Db::open(&config).unwrap();
        let applied: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn write_rolls_back_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        let result: tethered_core::Result<()> = db.write(|tx| {
            sq_execute(
                tx,
                tethered_api::db::users::insert("u1", "Mina", "student", "h1", "2024-01-01 00:00:00"),
            )
            .map_err(Error::store("insert user"))?;
            Err(Error::Unauthorized)
        });
        assert!(result.is_err());
        let found = sq_query_row(&db.conn(), tethered_api::db::users::get_by_id("u1"), user_from_row)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn duplicate_key_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(&StoreConfig::new(dir.path())).unwrap();
        let conn = db.conn();
        let insert = || tethered_api::db::users::insert("u1", "Mina", "student", "h1", "2024-01-01 00:00:00");
        sq_execute(&conn, insert()).unwrap();
        let err = sq_execute(&conn, insert()).unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
