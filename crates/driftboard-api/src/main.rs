// Driftboard API server: REST surface plus the board WebSocket gateway.
// Ordering of concurrent edits is the database's job (per-board advisory
// lock around the event append); this process stays stateless apart from
// the in-memory realtime registries.

mod auth;
mod boards;
mod comments;
mod error;
mod events;
mod services;
mod state;
mod tasks;
mod ws;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use driftboard_core::types::{Board, BoardEvent, Comment, Task, UserSummary};
use driftboard_core::UndoOutcome;
use driftboard_storage::Database;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        boards::create_board,
        boards::list_boards,
        boards::get_board,
        boards::update_board,
        boards::delete_board,
        tasks::create_task,
        tasks::list_tasks,
        tasks::update_task,
        tasks::delete_task,
        comments::add_comment,
        comments::list_comments,
        comments::update_comment,
        comments::delete_comment,
        events::list_events,
        events::undo_event,
        events::redo_event,
    ),
    components(
        schemas(
            Board, Task, Comment, BoardEvent, UserSummary,
            UndoOutcome,
            boards::BoardDetail,
            boards::CreateBoardRequest,
            boards::UpdateBoardRequest,
            tasks::CreateTaskRequest,
            tasks::UpdateTaskRequest,
            comments::CreateCommentRequest,
            comments::UpdateCommentRequest,
            events::UndoRequest,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "boards", description = "Board management endpoints"),
        (name = "tasks", description = "Task management endpoints"),
        (name = "comments", description = "Comment management endpoints"),
        (name = "events", description = "Event log, undo and redo endpoints")
    ),
    info(
        title = "Driftboard API",
        version = "0.1.0",
        description = "Collaborative board API with an ordered event log and live fan-out",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    tracing::info!("driftboard-api starting...");

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let db = Database::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Connected to database");

    let state = AppState::new(Arc::new(db));

    // Load CORS allowed origins from environment (optional)
    // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    let api_routes = Router::new()
        .merge(boards::routes(state.clone()))
        .merge(tasks::routes(state.clone()))
        .merge(comments::routes(state.clone()))
        .merge(events::routes(state.clone()))
        .merge(ws::routes(state.clone()));

    let app = Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
                .allow_credentials(true),
        )
    } else {
        app
    };

    let app = app.layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = Router::new().route("/health", get(health));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
    }
}
