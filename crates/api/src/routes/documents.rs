//! Route definitions for the `/documents` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::documents;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// POST   /upload              -> upload
/// PUT    /finalize            -> finalize
/// GET    /list                -> list
/// DELETE /delete/{file_id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(documents::upload))
        .route("/finalize", put(documents::finalize))
        .route("/list", get(documents::list))
        .route("/delete/{file_id}", delete(documents::delete))
}
