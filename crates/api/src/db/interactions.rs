//! Qualifying interaction log query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Interactions;

pub fn insert(
    id: &str,
    connection_id: &str,
    user_id: &str,
    kind: &str,
    day: &str,
    occurred_at: &str,
) -> Built {
    Query::insert()
        .into_table(Interactions::Table)
        .columns([
            Interactions::Id,
            Interactions::ConnectionId,
            Interactions::UserId,
            Interactions::Kind,
            Interactions::Day,
            Interactions::OccurredAt,
        ])
        .values_panic([
            id.into(),
            connection_id.into(),
            user_id.into(),
            kind.into(),
            day.into(),
            occurred_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Newest first. Column order matches `interaction_from_row()`.
pub fn list_for_connection(connection_id: &str, limit: u32) -> Built {
    Query::select()
        .columns([
            Interactions::Id,
            Interactions::ConnectionId,
            Interactions::UserId,
            Interactions::Kind,
            Interactions::Day,
            Interactions::OccurredAt,
        ])
        .from(Interactions::Table)
        .and_where(Expr::col(Interactions::ConnectionId).eq(connection_id))
        .order_by(Interactions::OccurredAt, Order::Desc)
        .order_by(Interactions::Id, Order::Desc)
        .limit(u64::from(limit))
        .build(SqliteQueryBuilder)
}
