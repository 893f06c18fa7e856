// Bearer-token verification. Session issuance is external to this service;
// we only resolve opaque tokens against the auth_sessions table.

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolve the request's bearer token to a user id, or fail Unauthorized
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    state
        .db
        .get_user_id_by_token(token)
        .await?
        .ok_or(ApiError::Unauthorized)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
