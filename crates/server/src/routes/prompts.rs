use axum::{Json, extract::State};
use chrono::Utc;

use tethered_api::PromptResponse;

use crate::AppState;
use crate::routes::auth::AuthUser;

/// GET /api/prompts/today: shared by every user; never fails.
pub async fn today(State(state): State<AppState>, _user: AuthUser) -> Json<PromptResponse> {
    let prompt = state.prompts.today(Utc::now()).await;
    Json(PromptResponse::from(&prompt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::TestApp;
    use tethered_core::UserRole;

    #[tokio::test]
    async fn unconfigured_generator_serves_fallback() {
        let app = TestApp::new();
        let user = app.user("Mina", UserRole::Student);
        let Json(prompt) = today(State(app.state.clone()), user).await;
        assert!(prompt.fallback);
        assert!(!prompt.text.is_empty());
        assert_eq!(prompt.date, tethered_core::time::format_day(app.state.clock.today(Utc::now())));
    }
}
