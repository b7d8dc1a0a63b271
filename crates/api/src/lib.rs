//! Shared API types, credentials, and SQL builders for Tethered.
//!
//! This crate is the single source of truth for request/response shapes.
//! TypeScript types for the mobile client are generated via `ts-rs`:
//!   cargo test -p tethered-api --features ts -- export_typescript --nocapture

use serde::{Deserialize, Serialize};

use tethered_core::{
    DailyPrompt, FamilyConnection, Interaction, InviteCode, InviteError, Streak, UserSummary,
};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
pub mod service;

// ─── Utilities ───────────────────────────────────────────────────────────────

/// Render an instant the way every response does (RFC 3339, seconds, `Z`).
pub fn wire_ts(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// Public profile of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    /// `"student"` or `"parent"`.
    pub role: String,
    pub avatar_url: Option<String>,
}

impl From<&UserSummary> for PublicUser {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RegisterRequest {
    pub name: String,
    pub role: String,
}

/// Returned once at registration; the API key is never shown again.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RegisterResponse {
    pub user: PublicUser,
    pub api_key: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

// ─── Invite codes ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct InviteCodeResponse {
    pub code: String,
    pub expires_at: String,
}

impl From<&InviteCode> for InviteCodeResponse {
    fn from(invite: &InviteCode) -> Self {
        Self {
            code: invite.code.clone(),
            expires_at: wire_ts(invite.expires_at),
        }
    }
}

/// Dry-run verification result. Exactly one of `owner` / `reason` is set.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct VerifyCodeResponse {
    pub valid: bool,
    pub owner: Option<PublicUser>,
    /// Machine tag such as `"expired"` or `"already_used"`.
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl VerifyCodeResponse {
    pub fn valid(owner: &UserSummary) -> Self {
        Self {
            valid: true,
            owner: Some(owner.into()),
            reason: None,
            message: None,
        }
    }

    pub fn invalid(err: InviteError) -> Self {
        Self {
            valid: false,
            owner: None,
            reason: Some(err.code().to_string()),
            message: Some(err.to_string()),
        }
    }
}

// ─── Connection + streak ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct StreakResponse {
    pub connection_id: String,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub last_interaction_date: Option<String>,
    /// `"starting"`, `"steady"`, `"eternal"`, or `null` for a zero streak.
    pub level: Option<String>,
    /// 0 for a zero streak, otherwise 1–3.
    pub level_rank: u8,
}

impl From<&Streak> for StreakResponse {
    fn from(streak: &Streak) -> Self {
        let level = streak.level();
        Self {
            connection_id: streak.connection_id.clone(),
            current_streak_days: streak.current_streak_days,
            longest_streak_days: streak.longest_streak_days,
            last_interaction_date: streak
                .last_interaction_date
                .map(tethered_core::time::format_day),
            level: level.map(|l| l.as_str().to_string()),
            level_rank: level.map_or(0, |l| l.rank()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ConnectionResponse {
    pub id: String,
    pub partner: PublicUser,
    pub connected_at: String,
    pub streak: StreakResponse,
}

impl ConnectionResponse {
    pub fn new(connection: &FamilyConnection, partner: &UserSummary, streak: &Streak) -> Self {
        Self {
            id: connection.id.clone(),
            partner: partner.into(),
            connected_at: wire_ts(connection.connected_at),
            streak: streak.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RecordInteractionRequest {
    /// `"check_in"`, `"reply"`, or `"prompt_answer"`.
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct InteractionResponse {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub day: String,
    pub occurred_at: String,
}

impl From<&Interaction> for InteractionResponse {
    fn from(i: &Interaction) -> Self {
        Self {
            id: i.id.clone(),
            user_id: i.user_id.clone(),
            kind: i.kind.as_str().to_string(),
            day: tethered_core::time::format_day(i.day),
            occurred_at: wire_ts(i.occurred_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RecordInteractionResponse {
    pub interaction: InteractionResponse,
    /// Which day-rule branch applied, e.g. `"continued"`.
    pub transition: String,
    pub streak: StreakResponse,
}

#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ListInteractionsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ListInteractionsResponse {
    pub interactions: Vec<InteractionResponse>,
}

// ─── Background jobs ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SweepResponse {
    pub success: bool,
    pub streaks_reset: usize,
    pub reminders_sent: usize,
    pub timestamp: String,
    pub reset_connections: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PromptResponse {
    pub date: String,
    pub text: String,
    pub generated_by: String,
    pub fallback: bool,
}

impl From<&DailyPrompt> for PromptResponse {
    fn from(p: &DailyPrompt) -> Self {
        Self {
            date: tethered_core::time::format_day(p.date),
            text: p.text.clone(),
            generated_by: p.generated_by.clone(),
            fallback: p.is_fallback(),
        }
    }
}

// ─── Misc ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error with an HTTP status mapping.
#[derive(Debug)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    /// An invite code that cannot be verified or redeemed.
    Invite(InviteError),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
            Self::Invite(e) => match e {
                InviteError::Malformed | InviteError::SelfRedemption => 400,
                InviteError::NotFound => 404,
                InviteError::AlreadyUsed => 409,
                InviteError::Expired => 410,
                _ => 400,
            },
        }
    }

    /// Stable machine-readable tag.
    pub fn code(&self) -> &str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
            Self::Invite(e) => e.code(),
        }
    }

    /// The error message.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m.clone(),
            Self::Invite(e) => e.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<tethered_core::Error> for ServiceError {
    fn from(e: tethered_core::Error) -> Self {
        use tethered_core::Error;
        match e {
            Error::Invite(invite) => Self::Invite(invite),
            Error::NotFound(_) => Self::NotFound(e.to_string()),
            Error::Forbidden(msg) => Self::Forbidden(msg.to_string()),
            Error::AlreadyConnected => Self::Conflict(e.to_string()),
            Error::Unauthorized => Self::Unauthorized(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON error body `{ "error": "...", "code": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message(),
            code: e.code().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tethered_core::testing::{at, day};
    use tethered_core::{Error, UserRole};

    #[test]
    fn invite_failures_map_to_distinct_statuses() {
        let expired = ServiceError::from(Error::Invite(InviteError::Expired));
        let used = ServiceError::from(Error::Invite(InviteError::AlreadyUsed));
        assert_eq!(expired.status_code(), 410);
        assert_eq!(used.status_code(), 409);
        assert_ne!(expired.message(), used.message());
        assert_eq!(ApiError::from(&expired).code, "expired");
    }

    #[test]
    fn internal_faults_hide_nothing_structural() {
        let e = ServiceError::from(Error::CodeSpaceExhausted { attempts: 8 });
        assert!(e.is_internal());
        assert_eq!(e.status_code(), 500);
        let e = ServiceError::from(Error::Forbidden("not a party to this connection"));
        assert_eq!(e.status_code(), 403);
        assert_eq!(e.message(), "not a party to this connection");
    }

    #[test]
    fn streak_response_derives_level() {
        let mut streak = Streak::new("c1", at("2024-01-01 00:00:00"));
        let zero = StreakResponse::from(&streak);
        assert_eq!(zero.level, None);
        assert_eq!(zero.level_rank, 0);

        streak.current_streak_days = 12;
        streak.longest_streak_days = 12;
        streak.last_interaction_date = Some(day("2024-01-12"));
        let steady = StreakResponse::from(&streak);
        assert_eq!(steady.level.as_deref(), Some("steady"));
        assert_eq!(steady.level_rank, 2);
        assert_eq!(steady.last_interaction_date.as_deref(), Some("2024-01-12"));
    }

    #[test]
    fn verify_response_shapes() {
        let owner = UserSummary {
            id: "u1".into(),
            name: "Mina".into(),
            role: UserRole::Student,
            avatar_url: None,
        };
        let ok = VerifyCodeResponse::valid(&owner);
        assert!(ok.valid);
        assert_eq!(ok.owner.as_ref().map(|o| o.role.as_str()), Some("student"));
        assert!(ok.reason.is_none());

        let bad = VerifyCodeResponse::invalid(InviteError::SelfRedemption);
        assert!(!bad.valid);
        assert!(bad.owner.is_none());
        assert_eq!(bad.reason.as_deref(), Some("self_redemption"));
    }

    #[test]
    fn wire_ts_is_rfc3339() {
        assert_eq!(wire_ts(at("2024-05-08 12:00:00")), "2024-05-08T12:00:00Z");
    }
}

// ─── TypeScript generation ───────────────────────────────────────────────────
