// Comment HTTP routes, nested under a task for create/list

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use driftboard_core::{constants::MAX_COMMENT_LENGTH, types::Comment};

use crate::auth::authenticate;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub content: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/tasks/{task_id}/comments",
            post(add_comment).get(list_comments),
        )
        .route(
            "/v1/comments/{comment_id}",
            delete(delete_comment).patch(update_comment),
        )
        .with_state(state)
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("content must not be empty".into()));
    }
    if content.len() > MAX_COMMENT_LENGTH {
        return Err(ApiError::Validation(format!(
            "content exceeds {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// POST /v1/tasks/{task_id}/comments - Comment on a task
#[utoipa::path(
    post,
    path = "/v1/tasks/{task_id}/comments",
    params(
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Task not found"),
        (status = 400, description = "Invalid comment content"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "comments"
)]
pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    validate_content(&req.content)?;

    let comment = state.comments.add(task_id, user_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /v1/tasks/{task_id}/comments - Comments on a task, oldest first
#[utoipa::path(
    get,
    path = "/v1/tasks/{task_id}/comments",
    params(
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Comments on the task", body = [Comment]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Task not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    let comments = state.comments.list(task_id, user_id).await?;
    Ok(Json(comments))
}

/// PATCH /v1/comments/{comment_id} - Edit a comment
#[utoipa::path(
    patch,
    path = "/v1/comments/{comment_id}",
    params(
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Comment not found"),
        (status = 400, description = "Invalid comment content"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;
    validate_content(&req.content)?;

    let comment = state
        .comments
        .update(comment_id, user_id, req.content)
        .await?;
    Ok(Json(comment))
}

/// DELETE /v1/comments/{comment_id} - Delete a comment (undoable)
#[utoipa::path(
    delete,
    path = "/v1/comments/{comment_id}",
    params(
        ("comment_id" = Uuid, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Comment not found"),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = authenticate(&state, &headers).await?;
    state.enforce_api_limit(user_id)?;

    state.comments.delete(comment_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_validation_bounds() {
        assert!(validate_content("looks good").is_ok());
        assert!(validate_content("  ").is_err());
        assert!(validate_content(&"c".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(validate_content(&"c".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
    }
}
