//! Periodic maintenance: reset stale streaks and remind at-risk ones.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tethered_api::db::{reminders, streaks};
use tethered_core::streak::{GRACE_WINDOW_HOURS, REMINDER_AFTER_HOURS};
use tethered_core::time::{format_day, format_ts};
use tethered_core::{ConnectionEvent, DayClock, Error, EventHub, Result};

use crate::db::{Db, sq_execute, sq_query_map};

/// A live streak inside the warning window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRisk {
    pub connection_id: String,
    pub current_streak_days: u32,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Connections whose streak was zeroed by this run.
    pub reset_connections: Vec<String>,
    /// Reminders newly recorded by this run.
    pub reminders: Vec<AtRisk>,
    pub ran_at: DateTime<Utc>,
}

/// Finds streaks 36 to 48 hours idle and records one reminder per
/// connection per day.
#[derive(Clone)]
pub struct ReminderEmitter {
    db: Db,
    clock: DayClock,
    events: EventHub,
}

impl ReminderEmitter {
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

    /// Pure query: live streaks with `36h <= now - last_interaction < 48h`.
    pub fn find_at_risk(&self, now: DateTime<Utc>) -> Result<Vec<AtRisk>> {
        let now = now.trunc_subsecs(0);
        let stale_cutoff = format_ts(now - Duration::hours(GRACE_WINDOW_HOURS));
        let warn_cutoff = format_ts(now - Duration::hours(REMINDER_AFTER_HOURS));
        sq_query_map(
            &self.db.conn(),
            streaks::at_risk(&stale_cutoff, &warn_cutoff),
            |row| {
                let days: i64 = row.get(1)?;
                Ok(AtRisk {
                    connection_id: row.get(0)?,
                    current_streak_days: u32::try_from(days).unwrap_or(u32::MAX),
                })
            },
        )
        .map_err(Error::store("find at-risk streaks"))
    }

    /// Record reminders for every at-risk streak not yet reminded today.
    /// Returns only the newly recorded ones.
    pub fn emit(&self, now: DateTime<Utc>) -> Result<Vec<AtRisk>> {
        let now = now.trunc_subsecs(0);
        let at_risk = self.find_at_risk(now)?;
        let today = format_day(self.clock.today(now));
        let now_ts = format_ts(now);

        let sent = self.db.write(|tx| {
            let mut sent = Vec::new();
            for candidate in at_risk {
                let inserted = sq_execute(
                    tx,
                    reminders::insert_once(
                        &candidate.connection_id,
                        &today,
                        i64::from(candidate.current_streak_days),
                        &now_ts,
                    ),
                )
                .map_err(Error::store("insert reminder"))?;
                if inserted == 1 {
                    sent.push(candidate);
                }
            }
            Ok(sent)
        })?;

        for reminder in &sent {
            self.events.publish(&ConnectionEvent::ReminderDue {
                connection_id: reminder.connection_id.clone(),
                current_streak_days: reminder.current_streak_days,
            });
        }
        Ok(sent)
    }
}

/// Zeroes streaks that nobody kept alive, with no caller in the loop.
#[derive(Clone)]
pub struct StreakSweeper {
    db: Db,
    events: EventHub,
    reminders: ReminderEmitter,
}

impl StreakSweeper {
    pub fn new(db: Db) -> Self {
        Self {
            reminders: ReminderEmitter::new(db.clone()),
            db,
            events: EventHub::new(),
        }
    }

    pub fn with_clock(mut self, clock: DayClock) -> Self {
        self.reminders = self.reminders.with_clock(clock);
        self
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.reminders = self.reminders.with_events(events.clone());
        self.events = events;
        self
    }

    /// Reset every live streak idle for at least 48 hours. A single
    /// conditional statement, so repeated or overlapping runs are no-ops
    /// and a streak refreshed by a concurrent interaction is never matched.
    pub fn reset_stale(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let now = now.trunc_subsecs(0);
        let cutoff = format_ts(now - Duration::hours(GRACE_WINDOW_HOURS));
        let reset = sq_query_map(
            &self.db.conn(),
            streaks::reset_stale(&cutoff, &format_ts(now)),
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .map_err(Error::store("reset stale streaks"))?;

        let mut ids = Vec::with_capacity(reset.len());
        for (connection_id, longest) in reset {
            self.events.publish(&ConnectionEvent::StreakReset {
                connection_id: connection_id.clone(),
                longest_streak_days: u32::try_from(longest).unwrap_or(u32::MAX),
            });
            ids.push(connection_id);
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// One full maintenance pass: resets first, then reminders.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let now = now.trunc_subsecs(0);
        let reset_connections = self.reset_stale(now)?;
        let reminders = self.reminders.emit(now)?;
        tracing::info!(
            streaks_reset = reset_connections.len(),
            reminders_sent = reminders.len(),
            "streak sweep complete"
        );
        Ok(SweepReport {
            reset_connections,
            reminders,
            ran_at: now,
        })
    }
}
