use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::response::MessageResponse;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
}

/// GET /health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = kbase_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// GET /v1/health/ -- liveness only, never touches the database.
async fn alive() -> Json<MessageResponse> {
    Json(MessageResponse::new("server is healthy, up and running"))
}

/// Mount health check routes (intended for root-level, NOT under `/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness routes merged into `/v1`, with and without trailing slash.
pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(alive))
        .route("/health/", get(alive))
}
