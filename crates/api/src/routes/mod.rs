pub mod documents;
pub mod health;
pub mod ingestion;
pub mod knowledge_bases;
pub mod tokens;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health/                                  liveness message (public)
///
/// /auth/generate/token                      access token (API key)
/// /auth/generate/key                        additional API key (API key)
///
/// /user/register                            create user (admin)
/// /user/list                                list users (admin)
/// /user/promote/{user_id}                   grant admin role (admin)
/// /user/delete/{user_id}                    delete user and their data (admin)
///
/// /documents/upload                         presigned upload URLs
/// /documents/finalize                       report upload outcomes
/// /documents/list                           caller's visible documents
/// /documents/delete/{file_id}               delete a document
///
/// /kb/create                                create knowledge base
/// /kb/list                                  caller's knowledge bases
/// /kb/docs/list                             documents of a knowledge base
/// /kb/delete/{kb_id}                        delete knowledge base
///
/// /ingestion/insert                         submit documents for embedding (POST)
/// /ingestion/delete                         remove documents from the index (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::v1_router())
        .nest("/auth/generate", tokens::router())
        .nest("/user", users::router())
        .nest("/documents", documents::router())
        .nest("/kb", knowledge_bases::router())
        .nest("/ingestion", ingestion::router())
}
