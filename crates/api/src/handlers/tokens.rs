//! Credential exchange, authenticated by API key.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kbase_core::error::CoreError;
use kbase_db::models::api_key::NewApiKey;
use kbase_db::repositories::{ApiKeyRepo, UserRepo};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::ApiKeyUser;
use crate::response::{MessageResponse, WithMessage};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenBody {
    pub token: String,
}

/// GET /v1/auth/generate/token
///
/// Exchange an API key for a bearer access token.
pub async fn generate_token(
    user: ApiKeyUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let token = state.tokens.create_access_token(user.user_id, &user.role)?;
    tracing::info!(user_id = user.user_id, "Access token issued");

    Ok((
        StatusCode::CREATED,
        Json(WithMessage::new(
            "generated token successfully",
            TokenBody { token },
        )),
    ))
}

/// GET /v1/auth/generate/key
///
/// Mint an additional API key for the caller and mail it to them.
pub async fn generate_key(
    user: ApiKeyUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let owner = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        })?;

    let generated = state.tokens.generate_api_key()?;
    ApiKeyRepo::create(&state.pool, owner.id, &NewApiKey::from(&generated)).await?;
    tracing::info!(user_id = owner.id, key_id = generated.key_id, "API key issued");

    state.mailer.send_api_key(&owner.email, &generated.plaintext).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "successfully generated api key, please check your mail",
        )),
    ))
}
