//! Shared database schema, migrations, and query builders.
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text in UTC and days as
//! `YYYY-MM-DD`, so both compare correctly as strings.

pub mod connections;
pub mod interactions;
pub mod invite_codes;
pub mod migrations;
pub mod prompts;
pub mod reminders;
pub mod streaks;
pub mod tables;
pub mod users;

// Re-export tables for convenience
pub use tables::*;

/// A built statement: SQL text plus bound values.
pub type Built = (String, sea_query::Values);
