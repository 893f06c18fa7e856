// API error taxonomy.
//
// Authorization and rate-limit checks always run before mutation and lock
// acquisition; validation rejects malformed input before anything touches
// the log. Rate-limit denials are soft: they carry a retry hint and never
// close the caller's connection.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid identity on the request
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not a member of the board
    #[error("forbidden")]
    Forbidden,

    /// Malformed input, rejected before touching the log or lock
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Soft denial; the caller should back off and retry
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// Store unavailable or otherwise transient
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

/// Error body shared by every non-2xx response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, retry_after) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", None),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            ApiError::RateLimited { retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", Some(*retry_after_secs))
            }
            ApiError::Database(err) => {
                tracing::error!("database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", None)
            }
            ApiError::Internal(err) => {
                tracing::error!("internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", None)
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
            code,
            retry_after_secs: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
