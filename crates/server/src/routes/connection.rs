use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};

use tethered_api::service::{clamp_list_limit, parse_interaction_kind};
use tethered_api::{
    ConnectionResponse, InteractionResponse, ListInteractionsQuery, ListInteractionsResponse,
    OkResponse, PublicUser, RecordInteractionRequest, RecordInteractionResponse, StreakResponse,
};
use tethered_core::{ConnectionEvent, EventHub, Subscription};

use crate::AppState;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// GET /api/connection: the caller's connection, partner and streak, or `null`.
pub async fn get_connection(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<ConnectionResponse>>, ApiErr> {
    let overview = state.connections.overview(user.id())?;
    Ok(Json(overview.map(|o| {
        ConnectionResponse::new(&o.connection, &o.partner, &o.streak)
    })))
}

/// GET /api/connection/partner: the other party's profile, or `null`.
pub async fn get_partner(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<PublicUser>>, ApiErr> {
    let partner = state.connections.get_partner(user.id())?;
    Ok(Json(partner.as_ref().map(PublicUser::from)))
}

/// DELETE /api/connection/{id}: irreversible; either party may do it.
pub async fn disconnect(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    state.connections.disconnect(&id, user.id())?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/connection/streak
pub async fn get_streak(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<StreakResponse>, ApiErr> {
    let streak = state
        .tracker
        .streak_for_user(user.id())?
        .ok_or_else(|| ApiErr::not_found("not connected"))?;
    Ok(Json(StreakResponse::from(&streak)))
}

/// POST /api/connection/interactions: a check-in, reply or prompt answer.
pub async fn record_interaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RecordInteractionRequest>,
) -> Result<(StatusCode, Json<RecordInteractionResponse>), ApiErr> {
    let kind = parse_interaction_kind(&req.kind)?;
    let recorded = state.tracker.record(user.id(), kind, Utc::now())?;
    Ok((
        StatusCode::CREATED,
        Json(RecordInteractionResponse {
            interaction: InteractionResponse::from(&recorded.interaction),
            transition: recorded.transition.as_str().to_string(),
            streak: StreakResponse::from(&recorded.streak),
        }),
    ))
}

/// GET /api/connection/interactions?limit=N: newest first.
pub async fn list_interactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<ListInteractionsQuery>,
) -> Result<Json<ListInteractionsResponse>, ApiErr> {
    let interactions = state
        .tracker
        .list_interactions(user.id(), clamp_list_limit(q.limit))?;
    Ok(Json(ListInteractionsResponse {
        interactions: interactions.iter().map(InteractionResponse::from).collect(),
    }))
}

/// Events buffered per stream before a slow client starts missing them.
const EVENT_BUFFER: usize = 64;

/// Bridge hub callbacks into a bounded channel. Publishing never blocks:
/// when the reader falls behind, new events are dropped for that stream.
fn forward_events(
    hub: &EventHub,
    connection_id: &str,
) -> (Subscription, mpsc::Receiver<ConnectionEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let subscription = hub.subscribe(connection_id, move |event| {
        if let Err(mpsc::error::TrySendError::Full(dropped)) = tx.try_send(event.clone()) {
            tracing::debug!(
                connection_id = dropped.connection_id(),
                kind = dropped.kind(),
                "event stream lagging, dropping event"
            );
        }
    });
    (subscription, rx)
}

/// GET /api/connection/events: Server-Sent Events for the caller's connection.
///
/// The subscription lives as long as the response stream; a client
/// disconnect drops it.
pub async fn events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiErr> {
    let connection = state
        .connections
        .get_connection(user.id())?
        .ok_or_else(|| ApiErr::not_found("not connected"))?;

    let (subscription, rx) = forward_events(&state.events, &connection.id);
    tracing::debug!(connection_id = %connection.id, user_id = user.id(), "event stream opened");

    let stream = ReceiverStream::new(rx).map(move |event| {
        let _held = &subscription;
        let sse = Event::default().event(event.kind());
        Ok(match sse.json_data(&event) {
            Ok(with_data) => with_data,
            Err(e) => {
                tracing::error!("encoding event: {e}");
                Event::default().event(event.kind())
            }
        })
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
