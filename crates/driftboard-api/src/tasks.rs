// Task CRUD HTTP routes, nested under a board for create/list

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use driftboard_core::{
    constants::MAX_TITLE_LENGTH,
    types::{Task, TaskPatch},
};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub status: Option<String>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub details: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub details: Option<Value>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/boards/{board_id}/tasks",
            post(create_task).get(list_tasks),
        )
        .route(
            "/v1/tasks/{task_id}",
            delete(delete_task).patch(update_task),
        )
        .with_state(state)
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "title exceeds {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// POST /v1/boards/{board_id}/tasks - Create a task on a board
#[utoipa::path(
    post,
    path = "/v1/boards/{board_id}/tasks",
    params(
        ("board_id" = Uuid, Path, description = "Board ID")
    ),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 400, description = "Invalid task title"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    state.require_member(board_id, user_id).await?;
    validate_title(&req.title)?;

    let task = state.tasks.create(board_id, user_id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /v1/boards/{board_id}/tasks - Tasks on a board
#[utoipa::path(
    get,
    path = "/v1/boards/{board_id}/tasks",
    params(
        ("board_id" = Uuid, Path, description = "Board ID")
    ),
    responses(
        (status = 200, description = "Tasks on the board", body = [Task]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(board_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    state.require_member(board_id, user_id).await?;

    let tasks = state.tasks.list(board_id).await?;
    Ok(Json(tasks))
}

/// PATCH /v1/tasks/{task_id} - Patch a task's fields
#[utoipa::path(
    patch,
    path = "/v1/tasks/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Task not found"),
        (status = 400, description = "Invalid patch"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    if let Some(title) = &req.title {
        validate_title(title)?;
    }

    let patch = TaskPatch {
        title: req.title,
        status: req.status,
        assigned_to: req.assigned_to,
        details: req.details,
    };
    if patch.is_empty() {
        return Err(ApiError::Validation("patch must set at least one field".into()));
    }

    let task = state.tasks.update(task_id, user_id, patch).await?;
    Ok(Json(task))
}

/// DELETE /v1/tasks/{task_id} - Delete a task (undoable)
#[utoipa::path(
    delete,
    path = "/v1/tasks/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Task not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    state.tasks.delete(task_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation_bounds() {
        assert!(validate_title("Ship it").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"t".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let patch = TaskPatch {
            title: None,
            status: None,
            assigned_to: None,
            details: None,
        };
        assert!(patch.is_empty());
    }
}
