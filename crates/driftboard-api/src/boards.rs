// Board CRUD HTTP routes

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use driftboard_core::{
    constants::MAX_TITLE_LENGTH,
    types::{Board, BoardPatch, Task},
};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBoardRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBoardRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A board together with its tasks, as served by GET /v1/boards/{board_id}
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoardDetail {
    pub board: Board,
    pub tasks: Vec<Task>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/boards", post(create_board).get(list_boards))
        .route(
            "/v1/boards/{board_id}",
            get(get_board).patch(update_board).delete(delete_board),
        )
        .with_state(state)
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if name.len() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "name exceeds {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// POST /v1/boards - Create a board owned by the caller
#[utoipa::path(
    post,
    path = "/v1/boards",
    request_body = CreateBoardRequest,
    responses(
        (status = 201, description = "Board created", body = Board),
        (status = 401, description = "Missing or invalid token"),
        (status = 400, description = "Invalid board name"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "boards"
)]
pub async fn create_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<Board>), ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    validate_name(&req.name)?;

    let board = state
        .boards
        .create(user_id, req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(board)))
}

/// GET /v1/boards - Boards the caller belongs to
#[utoipa::path(
    get,
    path = "/v1/boards",
    responses(
        (status = 200, description = "Boards for the caller", body = [Board]),
        (status = 401, description = "Missing or invalid token"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "boards"
)]
pub async fn list_boards(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Board>>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    let boards = state.boards.list(user_id).await?;
    Ok(Json(boards))
}

/// GET /v1/boards/{board_id} - Board with its tasks
#[utoipa::path(
    get,
    path = "/v1/boards/{board_id}",
    params(
        ("board_id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 200, description = "Board found", body = BoardDetail),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Board not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "boards"
)]
pub async fn get_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
) -> Result<Json<BoardDetail>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    state.require_member(board_id, user_id).await?;

    let detail = state.boards.detail(board_id).await?;
    Ok(Json(detail))
}

/// PATCH /v1/boards/{board_id} - Rename or re-describe a board
#[utoipa::path(
    patch,
    path = "/v1/boards/{board_id}",
    params(
        ("board_id" = Uuid, Path, description = "Board ID")
    ),
    request_body = UpdateBoardRequest,
    responses(
        (status = 200, description = "Board updated", body = Board),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Board not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "boards"
)]
pub async fn update_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    state.require_member(board_id, user_id).await?;
    if let Some(name) = &req.name {
        validate_name(name)?;
    }

    let patch = BoardPatch {
        name: req.name,
        description: req.description,
    };
    let board = state.boards.update(board_id, user_id, patch).await?;
    Ok(Json(board))
}

/// DELETE /v1/boards/{board_id} - Hard-delete a board (owner only)
#[utoipa::path(
    delete,
    path = "/v1/boards/{board_id}",
    params(
        ("board_id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 204, description = "Board deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not the owner"),
        (status = 404, description = "Board not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "boards"
)]
pub async fn delete_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    let board = state
        .db
        .get_board(board_id)
        .await?
        .ok_or(ApiError::NotFound("board"))?;
    if board.owner_id != user_id {
        return Err(ApiError::Forbidden);
    }

    state.boards.delete(board_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation_bounds() {
        assert!(validate_name("Sprint board").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_TITLE_LENGTH)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }
}
