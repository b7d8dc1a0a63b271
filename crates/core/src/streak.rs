//! Consecutive-day interaction streaks.
//!
//! A streak counts calendar days (in the canonical [`DayClock`](crate::time::DayClock)
//! calendar) that contain at least one qualifying interaction. The day
//! rule lives in [`Streak::advance`]. The stale sweep and reminder window
//! are measured against the wall-clock `last_interaction_at` by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A streak is broken once this many hours pass without an interaction.
pub const GRACE_WINDOW_HOURS: i64 = 48;

/// Reminders go out once this many hours have passed, until the grace window closes.
pub const REMINDER_AFTER_HOURS: i64 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub connection_id: String,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub last_interaction_date: Option<NaiveDate>,
    pub last_interaction_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Which branch of the day rule an interaction took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// First interaction ever recorded on this connection.
    Started,
    /// Another interaction on a day that already counted.
    SameDay,
    /// The day right after the last counted day.
    Continued,
    /// A gap of two or more days; the streak restarts at 1.
    Restarted,
    /// Interaction dated before the last counted day (clock skew); ignored.
    Backdated,
}

impl Transition {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Started => "started",
            Self::SameDay => "same_day",
            Self::Continued => "continued",
            Self::Restarted => "restarted",
            Self::Backdated => "backdated",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Streak {
    /// Zeroed record created together with its connection.
    pub fn new(connection_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            current_streak_days: 0,
            longest_streak_days: 0,
            last_interaction_date: None,
            last_interaction_at: None,
            updated_at: now,
        }
    }

    /// Classify an interaction on `today` against the last counted day.
    pub fn transition_for(&self, today: NaiveDate) -> Transition {
        let Some(last) = self.last_interaction_date else {
            return Transition::Started;
        };
        match (today - last).num_days() {
            0 => Transition::SameDay,
            1 => Transition::Continued,
            n if n > 1 => Transition::Restarted,
            _ => Transition::Backdated,
        }
    }

    /// Return the streak after an interaction on `today` at instant `now`.
    ///
    /// Same-day calls leave the counter alone, so the operation is
    /// idempotent per calendar day. A same-day call on a streak the sweeper
    /// already zeroed restores it to 1: the day still has an interaction.
    pub fn advance(&self, today: NaiveDate, now: DateTime<Utc>) -> (Self, Transition) {
        let transition = self.transition_for(today);
        let mut next = self.clone();
        match transition {
            Transition::Started | Transition::Restarted => {
                next.current_streak_days = 1;
                next.last_interaction_date = Some(today);
            }
            Transition::Continued => {
                next.current_streak_days = self.current_streak_days.saturating_add(1);
                next.last_interaction_date = Some(today);
            }
            Transition::SameDay => {
                next.current_streak_days = self.current_streak_days.max(1);
            }
            Transition::Backdated => {}
        }
        if transition != Transition::Backdated {
            next.last_interaction_at = Some(match self.last_interaction_at {
                Some(prev) if prev > now => prev,
                _ => now,
            });
        }
        next.longest_streak_days = next.longest_streak_days.max(next.current_streak_days);
        next.updated_at = now;
        (next, transition)
    }

    pub fn level(&self) -> Option<StreakLevel> {
        StreakLevel::for_days(self.current_streak_days)
    }
}

/// Presentation tier derived from the current streak length. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakLevel {
    /// 1–9 days.
    Starting,
    /// 10–29 days.
    Steady,
    /// 30 days and beyond.
    Eternal,
}

impl StreakLevel {
    /// `None` for a zero-day streak.
    pub fn for_days(days: u32) -> Option<Self> {
        match days {
            0 => None,
            1..=9 => Some(Self::Starting),
            10..=29 => Some(Self::Steady),
            _ => Some(Self::Eternal),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Steady => "steady",
            Self::Eternal => "eternal",
        }
    }

    /// 1-based tier number used by clients to pick flame artwork.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Starting => 1,
            Self::Steady => 2,
            Self::Eternal => 3,
        }
    }
}

impl std::fmt::Display for StreakLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{parse_day, parse_ts};
    use chrono::Duration;

    fn day(raw: &str) -> NaiveDate {
        parse_day(raw).unwrap()
    }

    fn at(raw: &str) -> DateTime<Utc> {
        parse_ts(raw).unwrap()
    }

    fn streak_with(current: u32, longest: u32, last: &str, last_at: &str) -> Streak {
        Streak {
            connection_id: "c1".into(),
            current_streak_days: current,
            longest_streak_days: longest,
            last_interaction_date: Some(day(last)),
            last_interaction_at: Some(at(last_at)),
            updated_at: at(last_at),
        }
    }

    #[test]
    fn first_interaction_starts_at_one() {
        let now = at("2024-06-01 08:00:00");
        let (next, t) = Streak::new("c1", now).advance(day("2024-06-01"), now);
        assert_eq!(t, Transition::Started);
        assert_eq!(next.current_streak_days, 1);
        assert_eq!(next.longest_streak_days, 1);
        assert_eq!(next.last_interaction_date, Some(day("2024-06-01")));
        assert_eq!(next.last_interaction_at, Some(now));
    }

    #[test]
    fn same_day_is_idempotent() {
        let s = streak_with(4, 7, "2024-06-01", "2024-06-01 08:00:00");
        let later = at("2024-06-01 21:00:00");
        let (once, t) = s.advance(day("2024-06-01"), later);
        let (twice, _) = once.advance(day("2024-06-01"), later);
        assert_eq!(t, Transition::SameDay);
        assert_eq!(once.current_streak_days, 4);
        assert_eq!(twice.current_streak_days, 4);
        assert_eq!(twice.longest_streak_days, 7);
        assert_eq!(twice.updated_at, later);
    }

    #[test]
    fn next_day_increments_by_one() {
        let s = streak_with(4, 4, "2024-06-01", "2024-06-01 08:00:00");
        let (next, t) = s.advance(day("2024-06-02"), at("2024-06-02 23:59:00"));
        assert_eq!(t, Transition::Continued);
        assert_eq!(next.current_streak_days, 5);
        assert_eq!(next.longest_streak_days, 5);
    }

    #[test]
    fn gap_restarts_at_one_not_zero() {
        let s = streak_with(12, 12, "2024-06-01", "2024-06-01 08:00:00");
        for gap in [2, 3, 30] {
            let (next, t) = s.advance(day("2024-06-01") + Duration::days(gap), at("2024-08-01 00:00:00"));
            assert_eq!(t, Transition::Restarted);
            assert_eq!(next.current_streak_days, 1);
            assert_eq!(next.longest_streak_days, 12);
        }
    }

    #[test]
    fn backdated_interaction_is_ignored() {
        let s = streak_with(3, 3, "2024-06-05", "2024-06-05 08:00:00");
        let (next, t) = s.advance(day("2024-06-04"), at("2024-06-05 09:00:00"));
        assert_eq!(t, Transition::Backdated);
        assert_eq!(next.current_streak_days, 3);
        assert_eq!(next.last_interaction_date, s.last_interaction_date);
        assert_eq!(next.last_interaction_at, s.last_interaction_at);
    }

    #[test]
    fn continuing_after_a_sweep_counts_from_one() {
        // swept to 0 while still on the day after (clock skew between
        // sweeper and day boundary)
        let s = streak_with(0, 9, "2024-06-01", "2024-06-01 00:00:00");
        let (next, t) = s.advance(day("2024-06-02"), at("2024-06-02 10:00:00"));
        assert_eq!(t, Transition::Continued);
        assert_eq!(next.current_streak_days, 1);
    }

    #[test]
    fn longest_never_decreases_over_a_sequence() {
        let mut s = Streak::new("c1", at("2024-01-01 00:00:00"));
        let days = [0, 1, 2, 2, 3, 7, 8, 8, 9, 10, 11, 12, 20];
        let mut prev_longest = 0;
        for offset in days {
            let today = day("2024-01-01") + Duration::days(offset);
            let now = today.and_hms_opt(12, 0, 0).unwrap().and_utc();
            s = s.advance(today, now).0;
            assert!(s.longest_streak_days >= prev_longest);
            assert!(s.longest_streak_days >= s.current_streak_days);
            prev_longest = s.longest_streak_days;
        }
        assert_eq!(s.longest_streak_days, 6);
        assert_eq!(s.current_streak_days, 1);
    }

    #[test]
    fn levels_follow_day_bands() {
        assert_eq!(StreakLevel::for_days(0), None);
        assert_eq!(StreakLevel::for_days(1), Some(StreakLevel::Starting));
        assert_eq!(StreakLevel::for_days(9), Some(StreakLevel::Starting));
        assert_eq!(StreakLevel::for_days(10), Some(StreakLevel::Steady));
        assert_eq!(StreakLevel::for_days(29), Some(StreakLevel::Steady));
        assert_eq!(StreakLevel::for_days(30), Some(StreakLevel::Eternal));
        assert_eq!(StreakLevel::Eternal.rank(), 3);
    }

    #[test]
    fn level_serializes_snake_case() {
        let json = serde_json::to_string(&StreakLevel::Steady).unwrap();
        assert_eq!(json, "\"steady\"");
    }
}
