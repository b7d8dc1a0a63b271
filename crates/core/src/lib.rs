//! Domain model for Tethered family connections and streaks.
//!
//! Nothing here touches storage or reads the clock. Callers pass `now` and the
//! store crate persists the values these types compute.

pub mod blob;
pub mod connection;
pub mod error;
pub mod events;
pub mod invite;
pub mod prompt;
pub mod streak;
pub mod time;
pub mod user;

pub use connection::{FamilyConnection, Interaction, InteractionKind};
pub use error::{Error, InviteError, Result};
pub use events::{ConnectionEvent, EventHub, Subscription};
pub use invite::InviteCode;
pub use prompt::{DailyPrompt, PromptGenerator};
pub use streak::{Streak, StreakLevel, Transition};
pub use time::DayClock;
pub use user::{UserRole, UserSummary};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
