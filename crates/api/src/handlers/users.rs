//! Admin handlers for user management.
//!
//! All endpoints require the admin role via [`RequireAdmin`]. Users never
//! have passwords: registering a user mints an API key and mails it to
//! them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kbase_core::pagination::DEFAULT_USER_LIMIT;
use kbase_core::types::DbId;
use kbase_db::models::api_key::NewApiKey;
use kbase_db::models::status::ClientRole;
use kbase_db::models::user::UserListItem;
use kbase_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{MessageResponse, WithMessage};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserListItem>,
    pub total_count: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/user/register
///
/// Create a `USER` together with a fresh API key and mail the key.
pub async fn register(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<RegisterUser>,
) -> AppResult<impl IntoResponse> {
    let input = RegisterUser {
        email: input.email.trim().to_string(),
    };
    input
        .validate()
        .map_err(|_| AppError::BadRequest("email must be a valid email address".into()))?;

    let generated = state.tokens.generate_api_key()?;
    let user = UserRepo::create_with_key(
        &state.pool,
        &input.email,
        ClientRole::User,
        &NewApiKey::from(&generated),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "uq_users_email") {
            AppError::BadRequest("user already exists".into())
        } else {
            e.into()
        }
    })?;

    tracing::info!(
        user_id = user.id,
        admin_id = admin.user_id,
        key_id = generated.key_id,
        "User registered"
    );

    state.mailer.send_api_key(&user.email, &generated.plaintext).await;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "user registered successfully, api key sent by mail",
        )),
    ))
}

/// GET /v1/user/list
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.resolve(DEFAULT_USER_LIMIT);
    let (users, total_count) = UserRepo::list(&state.pool, limit, offset).await?;

    let message = if users.is_empty() {
        "no users found"
    } else {
        "users fetched successfully"
    };
    Ok(Json(WithMessage::new(
        message,
        UserList { users, total_count },
    )))
}

/// PATCH /v1/user/promote/{user_id}
///
/// Grant the admin role. Promoting an admin is a no-op.
pub async fn promote(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    require_user_id(user_id)?;

    let user = UserRepo::set_role(&state.pool, user_id, ClientRole::Admin)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("user {user_id} does not exist")))?;

    tracing::info!(user_id = user.id, admin_id = admin.user_id, "User promoted to admin");
    Ok(Json(MessageResponse::new("user promoted to admin")))
}

/// DELETE /v1/user/delete/{user_id}
///
/// Delete a user with everything they own. Their indexes are released to
/// the cleanup worker and their objects removed from the bucket.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    require_user_id(user_id)?;
    if user_id == admin.user_id {
        return Err(AppError::BadRequest("you cannot delete yourself".into()));
    }

    let deleted = UserRepo::delete_cascade(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("user {user_id} does not exist")))?;

    tracing::info!(
        user_id,
        admin_id = admin.user_id,
        released_indexes = deleted.released_indexes,
        objects = deleted.object_keys.len(),
        "User deleted"
    );

    if deleted.released_indexes > 0 {
        state.provisioner.trigger_cleanup();
    }

    if !deleted.object_keys.is_empty() {
        if let Err(e) = state.object_store.delete_objects(&deleted.object_keys).await {
            tracing::error!(user_id, error = %e, "Failed to remove deleted user's objects");
        }
    }

    Ok(Json(MessageResponse::new("user deleted successfully")))
}

fn require_user_id(user_id: DbId) -> AppResult<()> {
    if user_id <= 0 {
        return Err(AppError::BadRequest("user_id is required".into()));
    }
    Ok(())
}
