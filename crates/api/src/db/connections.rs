//! Family connection query builders.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{ConnectionMembers, FamilyConnections};

/// Column order for `connection_from_row()`: id, party_a, party_b, connected_at.
fn connection_select() -> sea_query::SelectStatement {
    Query::select()
        .column((FamilyConnections::Table, FamilyConnections::Id))
        .column((FamilyConnections::Table, FamilyConnections::PartyA))
        .column((FamilyConnections::Table, FamilyConnections::PartyB))
        .column((FamilyConnections::Table, FamilyConnections::ConnectedAt))
        .from(FamilyConnections::Table)
        .to_owned()
}

pub fn insert(id: &str, party_a: &str, party_b: &str, connected_at: &str) -> Built {
    Query::insert()
        .into_table(FamilyConnections::Table)
        .columns([
            FamilyConnections::Id,
            FamilyConnections::PartyA,
            FamilyConnections::PartyB,
            FamilyConnections::ConnectedAt,
        ])
        .values_panic([
            id.into(),
            party_a.into(),
            party_b.into(),
            connected_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Claim the user's single membership slot. Fails on the primary key
/// when the user is already connected.
pub fn insert_member(user_id: &str, connection_id: &str) -> Built {
    Query::insert()
        .into_table(ConnectionMembers::Table)
        .columns([ConnectionMembers::UserId, ConnectionMembers::ConnectionId])
        .values_panic([user_id.into(), connection_id.into()])
        .build(SqliteQueryBuilder)
}

pub fn is_member(user_id: &str) -> Built {
    Query::select()
        .column(ConnectionMembers::ConnectionId)
        .from(ConnectionMembers::Table)
        .and_where(Expr::col(ConnectionMembers::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    connection_select()
        .and_where(Expr::col((FamilyConnections::Table, FamilyConnections::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

/// The connection the user belongs to, whichever side they occupy.
pub fn get_for_user(user_id: &str) -> Built {
    connection_select()
        .inner_join(
            ConnectionMembers::Table,
            Expr::col((ConnectionMembers::Table, ConnectionMembers::ConnectionId))
                .equals((FamilyConnections::Table, FamilyConnections::Id)),
        )
        .and_where(Expr::col((ConnectionMembers::Table, ConnectionMembers::UserId)).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Delete a connection. Members, streak, interactions and reminders cascade.
pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(FamilyConnections::Table)
        .and_where(Expr::col(FamilyConnections::Id).eq(id))
        .build(SqliteQueryBuilder)
}
