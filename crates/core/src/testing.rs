//! Fixtures for tests in downstream crates.

use chrono::{DateTime, NaiveDate, Utc};

use crate::time::{parse_day, parse_ts};

/// Parse a `YYYY-MM-DD HH:MM:SS` UTC instant; panics on bad input.
pub fn at(raw: &str) -> DateTime<Utc> {
    parse_ts(raw).unwrap_or_else(|| panic!("bad test timestamp: {raw}"))
}

/// Parse a `YYYY-MM-DD` day; panics on bad input.
pub fn day(raw: &str) -> NaiveDate {
    parse_day(raw).unwrap_or_else(|| panic!("bad test day: {raw}"))
}

/// Noon UTC on `day`.
pub fn noon(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(12, 0, 0)
        .unwrap_or_else(|| panic!("invalid time"))
        .and_utc()
}
