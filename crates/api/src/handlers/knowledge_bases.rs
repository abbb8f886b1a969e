//! Knowledge base handlers.
//!
//! Each knowledge base owns one vector index taken from the pre-provisioned
//! pool. Creating one drains the pool, so it always nudges the
//! reconciliation worker; deleting one releases the index to cleanup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kbase_core::error::CoreError;
use kbase_core::pagination::DEFAULT_LIST_LIMIT;
use kbase_core::types::DbId;
use kbase_db::models::knowledge_base::{KnowledgeBaseDocument, KnowledgeBaseListItem};
use kbase_db::repositories::KnowledgeBaseRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{KnowledgeBaseDocsParams, PaginationParams};
use crate::response::{MessageResponse, WithMessage};
use crate::state::AppState;

/// Maximum knowledge base name length in characters.
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateKnowledgeBase {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub kb_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct KnowledgeBaseList {
    pub kb: Vec<KnowledgeBaseListItem>,
    pub total_count: i64,
}

#[derive(Debug, Serialize)]
pub struct KnowledgeBaseDocList {
    pub kb_docs: Vec<KnowledgeBaseDocument>,
    pub total_count: i64,
    pub knowledge_base_id: DbId,
}

/// POST /v1/kb/create
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateKnowledgeBase>,
) -> AppResult<impl IntoResponse> {
    let name = input.name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }

    let created = KnowledgeBaseRepo::create_on_available_index(&state.pool, user.user_id, name).await;
    state.provisioner.trigger_reconciliation();

    let kb = created?.ok_or_else(|| {
        tracing::warn!(user_id = user.user_id, "No vector index available");
        CoreError::Unavailable("no vector index is available, try again shortly".into())
    })?;

    tracing::info!(
        user_id = user.user_id,
        kb_id = kb.id,
        index_id = kb.index_id,
        "Knowledge base created"
    );

    Ok((
        StatusCode::CREATED,
        Json(WithMessage::new(
            "knowledge base created successfully",
            Created { kb_id: kb.id },
        )),
    ))
}

/// GET /v1/kb/list
pub async fn list(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.resolve(DEFAULT_LIST_LIMIT);
    let (kb, total_count) =
        KnowledgeBaseRepo::list_for_user(&state.pool, user.user_id, limit, offset).await?;

    let message = if kb.is_empty() {
        "no knowledge bases found"
    } else {
        "knowledge bases fetched successfully"
    };
    Ok(Json(WithMessage::new(
        message,
        KnowledgeBaseList { kb, total_count },
    )))
}

/// GET /v1/kb/docs/list?kb_id=
pub async fn list_documents(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<KnowledgeBaseDocsParams>,
) -> AppResult<impl IntoResponse> {
    if params.kb_id <= 0 {
        return Err(AppError::BadRequest("kb_id is required".into()));
    }

    let (limit, offset) = params.page().resolve(DEFAULT_LIST_LIMIT);
    let (kb_docs, total_count) =
        KnowledgeBaseRepo::list_documents(&state.pool, user.user_id, params.kb_id, limit, offset)
            .await?;

    let message = if kb_docs.is_empty() {
        "no documents found in knowledge base"
    } else {
        "knowledge base documents fetched successfully"
    };
    Ok(Json(WithMessage::new(
        message,
        KnowledgeBaseDocList {
            kb_docs,
            total_count,
            knowledge_base_id: params.kb_id,
        },
    )))
}

/// DELETE /v1/kb/delete/{kb_id}
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(kb_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if kb_id <= 0 {
        return Err(AppError::BadRequest("kb_id is required".into()));
    }

    if !KnowledgeBaseRepo::delete_for_user(&state.pool, user.user_id, kb_id).await? {
        return Err(CoreError::NotFound {
            entity: "KnowledgeBase",
            id: kb_id,
        }
        .into());
    }

    state.provisioner.trigger_cleanup();
    tracing::info!(user_id = user.user_id, kb_id, "Knowledge base deleted");
    Ok(Json(MessageResponse::new("knowledge base deleted successfully")))
}
