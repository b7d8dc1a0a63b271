//! Timestamp/day encoding and the canonical day boundary.
//!
//! Timestamps are persisted in SQLite `datetime` format (UTC, second
//! precision) so they compare lexicographically in SQL. Days are ISO dates.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .map(|naive| naive.and_utc())
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT).ok()
}

/// Maps server instants onto the single calendar every streak is counted in.
///
/// Clients never supply "today"; it is derived here at commit time.
#[derive(Debug, Clone, Copy)]
pub struct DayClock {
    offset: FixedOffset,
}

impl DayClock {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Offset in minutes east of UTC. Out-of-range values fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        match minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => Self { offset },
            None => {
                tracing::warn!("day boundary offset {minutes}m out of range, using UTC");
                Self::utc()
            }
        }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn timestamp_roundtrip_is_lexicographically_ordered() {
        let a = parse_ts("2024-03-01 09:00:00").unwrap();
        let b = a + Duration::hours(30);
        assert_eq!(parse_ts(&format_ts(b)), Some(b));
        assert!(format_ts(a) < format_ts(b));
    }

    #[test]
    fn parse_ts_accepts_rfc3339() {
        let ts = parse_ts("2024-03-01T09:00:00Z").unwrap();
        assert_eq!(format_ts(ts), "2024-03-01 09:00:00");
    }

    #[test]
    fn day_clock_shifts_boundary() {
        let now = parse_ts("2024-03-01 23:30:00").unwrap();
        assert_eq!(DayClock::utc().today(now), parse_day("2024-03-01").unwrap());
        let seoul = DayClock::with_offset_minutes(9 * 60);
        assert_eq!(seoul.today(now), parse_day("2024-03-02").unwrap());
        let la = DayClock::with_offset_minutes(-8 * 60);
        assert_eq!(la.today(now), parse_day("2024-03-01").unwrap());
    }

    #[test]
    fn day_clock_rejects_absurd_offsets() {
        assert_eq!(DayClock::with_offset_minutes(100_000).offset_minutes(), 0);
    }
}
