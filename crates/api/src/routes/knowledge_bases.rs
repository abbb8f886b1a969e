//! Route definitions for the `/kb` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::knowledge_bases;
use crate::state::AppState;

/// Routes mounted at `/kb`.
///
/// ```text
/// POST   /create            -> create
/// GET    /list              -> list
/// GET    /docs/list         -> list_documents
/// DELETE /delete/{kb_id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(knowledge_bases::create))
        .route("/list", get(knowledge_bases::list))
        .route("/docs/list", get(knowledge_bases::list_documents))
        .route("/delete/{kb_id}", delete(knowledge_bases::delete))
}
