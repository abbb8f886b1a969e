//! Admin gate for the user-management routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kbase_core::error::CoreError;
use kbase_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Bearer-authenticated caller holding the `ADMIN` role.
///
/// A valid token with any other role is a 403, not a 401: the caller is
/// known, just not allowed.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = AuthUser::from_request_parts(parts, state).await?;
        if caller.role == ROLE_ADMIN {
            return Ok(RequireAdmin(caller));
        }

        tracing::info!(
            user_id = caller.user_id,
            role = %caller.role,
            path = %parts.uri.path(),
            "Non-admin caller refused"
        );
        Err(CoreError::Forbidden("only admins may manage users".into()).into())
    }
}
