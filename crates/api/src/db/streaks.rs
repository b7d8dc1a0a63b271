//! Streak query builders.
//!
//! Every write here is a single conditional statement so that concurrent
//! interactions and sweeps never lose an update.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Streaks;

/// Column order for `streak_from_row()`.
fn streak_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            Streaks::ConnectionId,
            Streaks::CurrentStreakDays,
            Streaks::LongestStreakDays,
            Streaks::LastInteractionDate,
            Streaks::LastInteractionAt,
            Streaks::UpdatedAt,
        ])
        .from(Streaks::Table)
        .to_owned()
}

pub fn get(connection_id: &str) -> Built {
    streak_select()
        .and_where(Expr::col(Streaks::ConnectionId).eq(connection_id))
        .build(SqliteQueryBuilder)
}

pub fn insert_zeroed(connection_id: &str, now: &str) -> Built {
    Query::insert()
        .into_table(Streaks::Table)
        .columns([
            Streaks::ConnectionId,
            Streaks::CurrentStreakDays,
            Streaks::LongestStreakDays,
            Streaks::UpdatedAt,
        ])
        .values_panic([connection_id.into(), 0i64.into(), 0i64.into(), now.into()])
        .build(SqliteQueryBuilder)
}

/// New values written by [`compare_and_set`].
pub struct StreakWrite<'a> {
    pub current_streak_days: i64,
    pub longest_streak_days: i64,
    pub last_interaction_date: Option<&'a str>,
    pub last_interaction_at: Option<&'a str>,
    pub updated_at: &'a str,
}

/// The state the writer read before computing [`StreakWrite`].
pub struct StreakRead<'a> {
    pub current_streak_days: i64,
    pub last_interaction_date: Option<&'a str>,
}

/// Write the next streak state only if the row still holds what was read.
/// Zero affected rows means another writer got there first.
pub fn compare_and_set(connection_id: &str, read: &StreakRead<'_>, write: &StreakWrite<'_>) -> Built {
    let mut q = Query::update();
    q.table(Streaks::Table)
        .value(Streaks::CurrentStreakDays, write.current_streak_days)
        .value(Streaks::LongestStreakDays, write.longest_streak_days)
        .value(
            Streaks::LastInteractionDate,
            write.last_interaction_date.map(str::to_string),
        )
        .value(
            Streaks::LastInteractionAt,
            write.last_interaction_at.map(str::to_string),
        )
        .value(Streaks::UpdatedAt, write.updated_at)
        .and_where(Expr::col(Streaks::ConnectionId).eq(connection_id))
        .and_where(Expr::col(Streaks::CurrentStreakDays).eq(read.current_streak_days));
    match read.last_interaction_date {
        Some(date) => q.and_where(Expr::col(Streaks::LastInteractionDate).eq(date)),
        None => q.and_where(Expr::col(Streaks::LastInteractionDate).is_null()),
    };
    q.build(SqliteQueryBuilder)
}

/// Zero every live streak whose last interaction is at or before `cutoff`,
/// returning `connection_id, longest_streak_days` for each. The longest count and the
/// last-interaction columns are left alone.
pub fn reset_stale(cutoff: &str, now: &str) -> Built {
    Query::update()
        .table(Streaks::Table)
        .value(Streaks::CurrentStreakDays, 0i64)
        .value(Streaks::UpdatedAt, now)
        .and_where(Expr::col(Streaks::CurrentStreakDays).gt(0i64))
        .and_where(Expr::col(Streaks::LastInteractionAt).is_not_null())
        .and_where(Expr::col(Streaks::LastInteractionAt).lte(cutoff))
        .returning(Query::returning().columns([Streaks::ConnectionId, Streaks::LongestStreakDays]))
        .build(SqliteQueryBuilder)
}

/// Live streaks whose last interaction falls in `(stale_cutoff, warn_cutoff]`.
/// Returns `connection_id, current_streak_days`.
pub fn at_risk(stale_cutoff: &str, warn_cutoff: &str) -> Built {
    Query::select()
        .columns([Streaks::ConnectionId, Streaks::CurrentStreakDays])
        .from(Streaks::Table)
        .and_where(Expr::col(Streaks::CurrentStreakDays).gt(0i64))
        .and_where(Expr::col(Streaks::LastInteractionAt).gt(stale_cutoff))
        .and_where(Expr::col(Streaks::LastInteractionAt).lte(warn_cutoff))
        .order_by(Streaks::ConnectionId, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}
