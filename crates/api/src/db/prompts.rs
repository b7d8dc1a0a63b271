//! Daily prompt query builders.

use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::DailyPrompts;

/// Returns `date, prompt_text, generated_by`.
pub fn get(date: &str) -> Built {
    Query::select()
        .columns([DailyPrompts::Date, DailyPrompts::PromptText, DailyPrompts::GeneratedBy])
        .from(DailyPrompts::Table)
        .and_where(Expr::col(DailyPrompts::Date).eq(date))
        .build(SqliteQueryBuilder)
}

/// First writer wins; a concurrent generation for the same day is dropped.
pub fn insert_once(date: &str, text: &str, generated_by: &str, now: &str) -> Built {
    Query::insert()
        .into_table(DailyPrompts::Table)
        .columns([
            DailyPrompts::Date,
            DailyPrompts::PromptText,
            DailyPrompts::GeneratedBy,
            DailyPrompts::CreatedAt,
        ])
        .values_panic([date.into(), text.into(), generated_by.into(), now.into()])
        .on_conflict(OnConflict::column(DailyPrompts::Date).do_nothing().to_owned())
        .build(SqliteQueryBuilder)
}
