//! Streak reminder query builders.

use sea_query::{Expr, Func, OnConflict, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::StreakReminders;

/// Record a reminder unless one already exists for this connection and day.
/// One affected row means the reminder is new.
pub fn insert_once(connection_id: &str, reminder_date: &str, current_streak_days: i64, now: &str) -> Built {
    Query::insert()
        .into_table(StreakReminders::Table)
        .columns([
            StreakReminders::ConnectionId,
            StreakReminders::ReminderDate,
            StreakReminders::CurrentStreakDays,
            StreakReminders::CreatedAt,
        ])
        .values_panic([
            connection_id.into(),
            reminder_date.into(),
            current_streak_days.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::columns([StreakReminders::ConnectionId, StreakReminders::ReminderDate])
                .do_nothing()
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

pub fn count_for_connection(connection_id: &str) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(StreakReminders::Id)))
        .from(StreakReminders::Table)
        .and_where(Expr::col(StreakReminders::ConnectionId).eq(connection_id))
        .build(SqliteQueryBuilder)
}
