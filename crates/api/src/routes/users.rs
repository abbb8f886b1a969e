//! Route definitions for the `/user` resource.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/user`. All require the admin role.
///
/// ```text
/// POST   /register            -> register
/// GET    /list                -> list
/// PATCH  /promote/{user_id}   -> promote
/// DELETE /delete/{user_id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/list", get(users::list))
        .route("/promote/{user_id}", patch(users::promote))
        .route("/delete/{user_id}", delete(users::delete))
}
