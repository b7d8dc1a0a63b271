use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;

use tethered_api::crypto::shared_secret_matches;
use tethered_api::{SweepResponse, wire_ts};

use crate::AppState;
use crate::error::ApiErr;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// POST /api/cron/sweep-streaks: reset stale streaks and queue reminders.
///
/// Guarded by the `X-Cron-Secret` header; an unset secret rejects everything.
pub async fn sweep_streaks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiErr> {
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if !shared_secret_matches(&state.config.cron_secret, provided) {
        tracing::warn!("rejected cron call with missing or wrong secret");
        return Err(ApiErr::unauthorized("invalid cron secret"));
    }

    let report = state.sweeper.sweep(Utc::now())?;
    Ok(Json(SweepResponse {
        success: true,
        streaks_reset: report.reset_connections.len(),
        reminders_sent: report.reminders.len(),
        timestamp: wire_ts(report.ran_at),
        reset_connections: report.reset_connections,
    }))
}
