//! Connection lookups and teardown.

use tethered_api::db::{connections, users};
use tethered_core::{ConnectionEvent, Error, EventHub, FamilyConnection, Result, Streak, UserSummary};

use crate::db::{Db, connection_from_row, sq_execute, sq_query_row, user_from_row};
use crate::streaks::{connection_for, load_streak};

/// A user's connection together with the other party and the shared streak.
#[derive(Debug, Clone)]
pub struct ConnectionOverview {
    pub connection: FamilyConnection,
    pub partner: UserSummary,
    pub streak: Streak,
}

#[derive(Clone)]
pub struct ConnectionManager {
    db: Db,
    events: EventHub,
}

impl ConnectionManager {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            events: EventHub::new(),
        }
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = events;
        self
    }

    pub fn get_connection(&self, user_id: &str) -> Result<Option<FamilyConnection>> {
        connection_for(&self.db.conn(), user_id)
    }

    /// The other party's profile, whichever side `user_id` is on.
    pub fn get_partner(&self, user_id: &str) -> Result<Option<UserSummary>> {
        let conn = self.db.conn();
        let Some(connection) = connection_for(&conn, user_id)? else {
            return Ok(None);
        };
        let Some(partner_id) = connection.partner_of(user_id) else {
            return Ok(None);
        };
        sq_query_row(&conn, users::get_by_id(partner_id), user_from_row)
            .map_err(Error::store("get partner"))
    }

    pub fn overview(&self, user_id: &str) -> Result<Option<ConnectionOverview>> {
        let conn = self.db.conn();
        let Some(connection) = connection_for(&conn, user_id)? else {
            return Ok(None);
        };
        let partner_id = connection
            .partner_of(user_id)
            .ok_or(Error::NotFound("partner"))?;
        let partner = sq_query_row(&conn, users::get_by_id(partner_id), user_from_row)
            .map_err(Error::store("get partner"))?
            .ok_or(Error::NotFound("partner"))?;
        let streak = load_streak(&conn, &connection.id)?.ok_or(Error::NotFound("streak"))?;
        Ok(Some(ConnectionOverview {
            connection,
            partner,
            streak,
        }))
    }

    /// Delete the connection and everything hanging off it. Only a party
    /// to the connection may do this.
    pub fn disconnect(&self, connection_id: &str, requester: &str) -> Result<()> {
        self.db.write(|tx| {
            let connection = sq_query_row(tx, connections::get_by_id(connection_id), connection_from_row)
                .map_err(Error::store("get connection"))?
                .ok_or(Error::NotFound("connection"))?;
            if !connection.involves(requester) {
                return Err(Error::Forbidden("not a party to this connection"));
            }
            sq_execute(tx, connections::delete(connection_id))
                .map_err(Error::store("delete connection"))?;
            Ok(())
        })?;

        tracing::info!(connection_id, requester, "connection removed");
        self.events.publish(&ConnectionEvent::Disconnected {
            connection_id: connection_id.to_string(),
            by_user_id: requester.to_string(),
        });
        Ok(())
    }
}
