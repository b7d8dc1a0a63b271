use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use tethered_api::{ConnectionResponse, InviteCodeResponse, VerifyCodeResponse};
use tethered_core::Error;

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// POST /api/invite-codes: the caller's valid code, minted if needed.
pub async fn request_code(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<InviteCodeResponse>, ApiErr> {
    let invite = state.invites.request_code(user.id(), Utc::now())?;
    Ok(Json(InviteCodeResponse::from(&invite)))
}

/// GET /api/invite-codes/{code}: dry-run check while the user types.
///
/// Invalid codes are a normal answer here, not an error status.
pub async fn verify_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> Result<Json<VerifyCodeResponse>, ApiErr> {
    match state.invites.verify_code(&code, user.id(), Utc::now()) {
        Ok(owner) => Ok(Json(VerifyCodeResponse::valid(&owner))),
        Err(Error::Invite(reason)) => Ok(Json(VerifyCodeResponse::invalid(reason))),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/invite-codes/{code}/redeem: pair with the code's owner.
pub async fn redeem_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> Result<(StatusCode, Json<ConnectionResponse>), ApiErr> {
    let redemption = state.invites.redeem_code(&code, user.id(), Utc::now())?;
    Ok((
        StatusCode::CREATED,
        Json(ConnectionResponse::new(
            &redemption.connection,
            &redemption.partner,
            &redemption.streak,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::TestApp;
    use tethered_core::UserRole;

    #[tokio::test]
    async fn verify_then_redeem() {
        let app = TestApp::new();
        let owner = app.user("Mina", UserRole::Student);
        let partner = app.user("Dad", UserRole::Parent);
        let owner_id = owner.id().to_string();

        let Json(first) = request_code(State(app.state.clone()), owner).await.unwrap();
        let owner = AuthUser {
            user: app.state.users.get(&owner_id).unwrap().unwrap(),
        };
        let Json(again) = request_code(State(app.state.clone()), owner).await.unwrap();
        assert_eq!(first.code, again.code);

        let partner_id = partner.id().to_string();
        let Json(check) = verify_code(State(app.state.clone()), partner, Path(first.code.to_lowercase()))
            .await
            .unwrap();
        assert!(check.valid);
        assert_eq!(check.owner.unwrap().name, "Mina");

        let partner = AuthUser {
            user: app.state.users.get(&partner_id).unwrap().unwrap(),
        };
        let (status, Json(conn)) = redeem_code(State(app.state.clone()), partner, Path(first.code.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(conn.partner.id, owner_id);
        assert_eq!(conn.streak.current_streak_days, 1);
        assert_eq!(conn.streak.level.as_deref(), Some("starting"));

        // A third user now sees the code as used, with a 200 and a reason.
        let late = app.user("Mom", UserRole::Parent);
        let Json(check) = verify_code(State(app.state.clone()), late, Path(first.code.clone()))
            .await
            .unwrap();
        assert!(!check.valid);
        assert_eq!(check.reason.as_deref(), Some("already_used"));

        let late = app.user("Aunt", UserRole::Parent);
        let err = redeem_code(State(app.state.clone()), late, Path(first.code))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "already_used");
    }

    #[tokio::test]
    async fn own_code_is_rejected() {
        let app = TestApp::new();
        let owner = app.user("Mina", UserRole::Student);
        let owner_id = owner.id().to_string();
        let Json(code) = request_code(State(app.state.clone()), owner).await.unwrap();
        let owner = AuthUser {
            user: app.state.users.get(&owner_id).unwrap().unwrap(),
        };
        let err = redeem_code(State(app.state.clone()), owner, Path(code.code))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "self_redemption");
    }

    #[tokio::test]
    async fn unknown_code_verifies_as_not_found() {
        let app = TestApp::new();
        let user = app.user("Dad", UserRole::Parent);
        let Json(check) = verify_code(State(app.state.clone()), user, Path("ZZZZZZ".into()))
            .await
            .unwrap();
        assert!(!check.valid);
        assert_eq!(check.reason.as_deref(), Some("not_found"));
    }
}
