//! Authentication extractors for Axum handlers.
//!
//! Two credentials are accepted: a bearer access token on most routes, and
//! a raw API key (`X-API-Key`) on the token-issuing routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kbase_core::api_keys::credential_digest;
use kbase_core::error::CoreError;
use kbase_core::types::DbId;
use kbase_db::repositories::ApiKeyRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying a plaintext API key.
pub const API_KEY_HEADER: &str = "x-api-key";

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// Role name (`"ADMIN"` or `"USER"`).
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            unauthorized("Invalid Authorization format. Expected: Bearer <token>")
        })?;

        let claims = state.tokens.verify_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser {
            user_id: claims.user_id,
            role: claims.role,
        })
    }
}

/// User authenticated by an API key in the `X-API-Key` header.
///
/// The key is looked up by its SHA-256 digest and its signature is then
/// recomputed with the signing key it was minted under.
#[derive(Debug, Clone)]
pub struct ApiKeyUser {
    pub user_id: DbId,
    pub role: String,
}

impl FromRequestParts<AppState> for ApiKeyUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let plaintext = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| unauthorized("Missing X-API-Key header"))?;

        let owner = ApiKeyRepo::find_owner_by_credential(&state.pool, &credential_digest(plaintext))
            .await?
            .ok_or_else(|| unauthorized("Invalid API key"))?;

        let valid = state
            .tokens
            .verify_api_key(plaintext, &owner.key_signature, owner.key_id)
            .map_err(|e| {
                tracing::warn!(user_id = owner.user_id, error = %e, "API key signed with unusable key");
                unauthorized("Invalid API key")
            })?;
        if !valid {
            tracing::warn!(user_id = owner.user_id, "API key signature mismatch");
            return Err(unauthorized("Invalid API key"));
        }

        Ok(ApiKeyUser {
            user_id: owner.user_id,
            role: owner.role.as_str().to_string(),
        })
    }
}
