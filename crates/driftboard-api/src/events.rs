// Event log replay and undo/redo HTTP routes

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use driftboard_core::{constants::DEFAULT_EVENTS_LIMIT, BoardEvent, UndoOutcome};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEventsQuery {
    /// Return only events with a sequence number strictly greater than this
    pub after_seq: Option<i64>,
    /// Page size, clamped to the server maximum
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UndoRequest {
    pub event_id: Uuid,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/boards/{board_id}/events", get(list_events))
        .route("/v1/events/undo", post(undo_event))
        .route("/v1/events/redo", post(redo_event))
        .with_state(state)
}

/// GET /v1/boards/{board_id}/events - Replay the board's event log
#[utoipa::path(
    get,
    path = "/v1/boards/{board_id}/events",
    params(
        ("board_id" = Uuid, Path, description = "Board ID"),
        ListEventsQuery
    ),
    responses(
        (status = 200, description = "Events after the cursor, ascending", body = [BoardEvent]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<BoardEvent>>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    state.require_member(board_id, user_id).await?;

    let after_seq = query.after_seq.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_EVENTS_LIMIT);
    let events = state.events.list(board_id, after_seq, limit).await?;
    Ok(Json(events))
}

/// POST /v1/events/undo - Invert a past event
#[utoipa::path(
    post,
    path = "/v1/events/undo",
    request_body = UndoRequest,
    responses(
        (status = 200, description = "Compensating write applied", body = UndoOutcome),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member of the event's board"),
        (status = 404, description = "Event not found or cannot be undone"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "events"
)]
pub async fn undo_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UndoRequest>,
) -> Result<Json<UndoOutcome>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    let outcome = state
        .undo
        .undo(req.event_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(outcome))
}

/// POST /v1/events/redo - Replay a past event's forward effect
#[utoipa::path(
    post,
    path = "/v1/events/redo",
    request_body = UndoRequest,
    responses(
        (status = 200, description = "Forward effect reapplied", body = UndoOutcome),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member of the event's board"),
        (status = 404, description = "Event not found or cannot be redone"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "events"
)]
pub async fn redo_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UndoRequest>,
) -> Result<Json<UndoOutcome>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    let outcome = state
        .undo
        .redo(req.event_id, user_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(outcome))
}
