//! Route definitions for the `/ingestion` resource.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::ingestion;
use crate::state::AppState;

/// Routes mounted at `/ingestion`.
///
/// ```text
/// POST   /insert   -> insert
/// DELETE /delete   -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/insert", post(ingestion::insert))
        .route("/delete", delete(ingestion::delete))
}
