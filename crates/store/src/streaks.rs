//! Streak tracker: the day-rule state machine persisted with
//! compare-and-set writes.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::Connection;
use tethered_api::db::streaks::{self as q, StreakRead, StreakWrite};
use tethered_api::db::{connections, interactions};
use tethered_core::time::{format_day, format_ts};
use tethered_core::{
    ConnectionEvent, DayClock, Error, EventHub, FamilyConnection, Interaction, InteractionKind,
    Result, Streak, Transition,
};

use crate::db::{
    Db, connection_from_row, interaction_from_row, sq_execute, sq_query_map, sq_query_row,
    streak_from_row,
};

/// Writers that lose the compare-and-set race re-read and try again this
/// many times before giving up.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Outcome of a qualifying interaction.
#[derive(Debug, Clone)]
pub struct RecordedInteraction {
    pub interaction: Interaction,
    pub streak: Streak,
    pub transition: Transition,
}

pub(crate) fn load_streak(conn: &Connection, connection_id: &str) -> Result<Option<Streak>> {
    sq_query_row(conn, q::get(connection_id), streak_from_row).map_err(Error::store("get streak"))
}

/// Apply one day-rule step to the stored streak. Returns `None` when the
/// row changed between read and write.
pub(crate) fn try_advance(
    conn: &Connection,
    connection_id: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<(Streak, Transition)>> {
    let current = load_streak(conn, connection_id)?.ok_or(Error::NotFound("streak"))?;
    let (next, transition) = current.advance(today, now);

    let read_date = current.last_interaction_date.map(format_day);
    let next_date = next.last_interaction_date.map(format_day);
    let next_at = next.last_interaction_at.map(format_ts);
    let updated_at = format_ts(next.updated_at);
    let affected = sq_execute(
        conn,
        q::compare_and_set(
            connection_id,
            &StreakRead {
                current_streak_days: i64::from(current.current_streak_days),
                last_interaction_date: read_date.as_deref(),
            },
            &StreakWrite {
                current_streak_days: i64::from(next.current_streak_days),
                longest_streak_days: i64::from(next.longest_streak_days),
                last_interaction_date: next_date.as_deref(),
                last_interaction_at: next_at.as_deref(),
                updated_at: &updated_at,
            },
        ),
    )
    .map_err(Error::store("update streak"))?;

    Ok((affected == 1).then_some((next, transition)))
}

#[derive(Clone)]
pub struct StreakTracker {
    db: Db,
    clock: DayClock,
    events: EventHub,
}

impl StreakTracker {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            clock: DayClock::utc(),
            events: EventHub::new(),
        }
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = events;
        self
    }

    /// Advance the connection's streak for an interaction on `today`.
    ///
    /// Repeated calls on the same day leave the count unchanged.
    pub fn record_interaction(
        &self,
        connection_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(Streak, Transition)> {
        let now = now.trunc_subsecs(0);
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let outcome = self
                .db
                .write(|tx| try_advance(tx, connection_id, today, now))?;
            if let Some(done) = outcome {
                return Ok(done);
            }
            tracing::debug!(connection_id, attempt, "streak changed underneath, retrying");
        }
        Err(Error::Store(format!(
            "streak update for {connection_id} lost {MAX_CAS_ATTEMPTS} races"
        )))
    }

    /// Log a qualifying interaction by `user_id` and advance the streak of
    /// their connection, both in one transaction. "Today" comes from the
    /// tracker's clock.
    pub fn record(
        &self,
        user_id: &str,
        kind: InteractionKind,
        now: DateTime<Utc>,
    ) -> Result<RecordedInteraction> {
        let now = now.trunc_subsecs(0);
        let today = self.clock.today(now);
        let interaction_id = uuid::Uuid::new_v4().to_string();

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let outcome = self.db.write(|tx| {
                let connection = connection_for(tx, user_id)?.ok_or(Error::NotFound("connection"))?;
                let Some((streak, transition)) = try_advance(tx, &connection.id, today, now)? else {
                    return Ok(None);
                };
                sq_execute(
                    tx,
                    interactions::insert(
                        &interaction_id,
                        &connection.id,
                        user_id,
                        kind.as_str(),
                        &format_day(today),
                        &format_ts(now),
                    ),
                )
                .map_err(Error::store("insert interaction"))?;
                Ok(Some(RecordedInteraction {
                    interaction: Interaction {
                        id: interaction_id.clone(),
                        connection_id: connection.id,
                        user_id: user_id.to_string(),
                        kind,
                        day: today,
                        occurred_at: now,
                    },
                    streak,
                    transition,
                }))
            })?;

            if let Some(recorded) = outcome {
                tracing::info!(
                    connection_id = %recorded.streak.connection_id,
                    kind = %kind,
                    transition = %recorded.transition,
                    streak = recorded.streak.current_streak_days,
                    "recorded interaction"
                );
                self.events.publish(&ConnectionEvent::InteractionRecorded {
                    connection_id: recorded.streak.connection_id.clone(),
                    user_id: user_id.to_string(),
                    kind,
                    transition: recorded.transition,
                    current_streak_days: recorded.streak.current_streak_days,
                });
                return Ok(recorded);
            }
            tracing::debug!(user_id, attempt, "streak changed underneath, retrying");
        }
        Err(Error::Store(format!(
            "interaction for {user_id} lost {MAX_CAS_ATTEMPTS} streak races"
        )))
    }

    pub fn get_streak(&self, connection_id: &str) -> Result<Streak> {
        load_streak(&self.db.conn(), connection_id)?.ok_or(Error::NotFound("streak"))
    }

    /// The streak of the user's connection, if they have one.
    pub fn streak_for_user(&self, user_id: &str) -> Result<Option<Streak>> {
        let conn = self.db.conn();
        match connection_for(&conn, user_id)? {
            Some(connection) => load_streak(&conn, &connection.id),
            None => Ok(None),
        }
    }

    /// Newest interactions on the user's connection.
    pub fn list_interactions(&self, user_id: &str, limit: u32) -> Result<Vec<Interaction>> {
        let conn = self.db.conn();
        let connection = connection_for(&conn, user_id)?.ok_or(Error::NotFound("connection"))?;
        sq_query_map(
            &conn,
            interactions::list_for_connection(&connection.id, limit),
            interaction_from_row,
        )
        .map_err(Error::store("list interactions"))
    }
}

pub(crate) fn connection_for(conn: &Connection, user_id: &str) -> Result<Option<FamilyConnection>> {
    sq_query_row(conn, connections::get_for_user(user_id), connection_from_row)
        .map_err(Error::store("get connection"))
}
