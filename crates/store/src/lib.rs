//! SQLite-backed store client and the connection/streak services.
//!
//! Every service is built from an explicitly opened [`Db`]; there is no
//! global client. Operations that change shared state commit as a single
//! transaction or a single conditional statement.

pub mod blobs;
pub mod connections;
pub mod db;
pub mod invites;
pub mod prompts;
pub mod streaks;
pub mod sweeper;
pub mod users;

pub use blobs::LocalBlobStore;
pub use connections::{ConnectionManager, ConnectionOverview};
pub use db::{Db, StoreConfig};
pub use invites::{InviteService, Redemption};
pub use prompts::DailyPrompts;
pub use streaks::{RecordedInteraction, StreakTracker};
pub use sweeper::{AtRisk, ReminderEmitter, StreakSweeper, SweepReport};
pub use users::{Registration, UserDirectory};
