use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use chrono::Utc;

use tethered_api::service::{parse_role, validate_avatar_url, validate_name};
use tethered_api::{PublicUser, RegisterRequest, RegisterResponse, UpdateProfileRequest};
use tethered_core::UserSummary;
use tethered_store::UserDirectory;

use crate::AppState;
use crate::error::ApiErr;

/// Largest accepted avatar upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

const AVATAR_BUCKET: &str = "avatars";

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <api_key>` header.
#[derive(Debug)]
pub struct AuthUser {
    pub user: UserSummary,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    UserDirectory: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let users = UserDirectory::from_ref(state);

        let api_key = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;

        users
            .resolve_api_key(api_key)?
            .map(|user| AuthUser { user })
            .ok_or_else(|| ApiErr::unauthorized("invalid API key"))
    }
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// POST /api/register: create a user and return their API key once.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiErr> {
    let name = validate_name(&req.name)?;
    let role = parse_role(&req.role)?;
    let reg = state.users.register(&name, role, Utc::now())?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&reg.user),
            api_key: reg.api_key,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /api/me
pub async fn me(user: AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user.user))
}

/// PATCH /api/me: change name and/or avatar URL. An empty avatar URL clears it.
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiErr> {
    let name = req.name.as_deref().map(validate_name).transpose()?;
    let avatar_url = req
        .avatar_url
        .as_deref()
        .map(validate_avatar_url)
        .transpose()?;
    let updated = state.users.update_profile(
        user.id(),
        name.as_deref(),
        avatar_url.as_ref().map(Option::as_deref),
        Utc::now(),
    )?;
    Ok(Json(PublicUser::from(&updated)))
}

fn avatar_extension(headers: &HeaderMap) -> Option<&'static str> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    match content_type.split(';').next()?.trim() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// PUT /api/me/avatar: raw image body; stores it and points the profile at it.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PublicUser>, ApiErr> {
    let ext = avatar_extension(&headers)
        .ok_or_else(|| ApiErr::bad_request("avatar must be image/png, image/jpeg or image/webp"))?;
    if body.is_empty() {
        return Err(ApiErr::bad_request("empty avatar body"));
    }
    if body.len() > MAX_AVATAR_BYTES {
        return Err(ApiErr::bad_request("avatar too large"));
    }

    let path = format!("{}/avatar.{ext}", user.id());
    let url = state
        .blobs
        .upload(AVATAR_BUCKET, &path, &body)
        .map_err(ApiErr::from_db("store avatar"))?;

    // Replacing a different format leaves the old file behind otherwise.
    let prefix = format!("{}/blobs/{AVATAR_BUCKET}/", state.config.base_url);
    if let Some(old_path) = user
        .user
        .avatar_url
        .as_deref()
        .and_then(|old| old.strip_prefix(&prefix))
        .filter(|old| *old != path)
    {
        if let Err(e) = state.blobs.delete(AVATAR_BUCKET, old_path) {
            tracing::warn!("removing old avatar {old_path}: {e}");
        }
    }

    let updated = state
        .users
        .update_profile(user.id(), None, Some(Some(&url)), Utc::now())?;
    Ok(Json(PublicUser::from(&updated)))
}
