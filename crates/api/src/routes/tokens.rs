//! Route definitions for the `/auth/generate` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::tokens;
use crate::state::AppState;

/// Routes mounted at `/auth/generate`. Both require `X-API-Key`.
///
/// ```text
/// GET /token  -> generate_token
/// GET /key    -> generate_key
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", get(tokens::generate_token))
        .route("/key", get(tokens::generate_key))
}
