//! Handlers for the document registry.
//!
//! Uploads go directly from the client to the bucket via presigned URLs.
//! A document is registered `(locked, PENDING)` before the upload and
//! becomes visible once the client reports it in `finalize`.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kbase_core::content_type::{object_key, validate_upload_batch, validate_upload_filename};
use kbase_core::error::CoreError;
use kbase_core::pagination::DEFAULT_LIST_LIMIT;
use kbase_core::types::DbId;
use kbase_db::models::document::{DocumentListItem, NewDocument};
use kbase_db::repositories::document_repo::LockOutcome;
use kbase_db::repositories::DocumentRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::{MessageResponse, WithMessage};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadUrl {
    pub id: DbId,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadUrls {
    pub urls: Vec<UploadUrl>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub successful: Vec<DbId>,
    #[serde(default)]
    pub failed: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentListItem>,
    pub total_count: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/documents/upload
///
/// Register the files and return one presigned upload URL per file.
pub async fn upload(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UploadRequest>,
) -> AppResult<impl IntoResponse> {
    validate_upload_batch(&input.files)?;

    let mut new_documents = Vec::with_capacity(input.files.len());
    let mut urls_by_key = HashMap::with_capacity(input.files.len());
    for file_name in &input.files {
        let content_type = validate_upload_filename(file_name)?;
        let key = object_key(user.user_id, file_name);
        let url = state.object_store.presign_upload(&key, content_type).await?;
        urls_by_key.insert(key.clone(), url);
        new_documents.push(NewDocument {
            file_name: file_name.clone(),
            object_key: key,
        });
    }

    let documents = DocumentRepo::create_pending(&state.pool, user.user_id, &new_documents).await?;

    let urls = documents
        .into_iter()
        .filter_map(|doc| {
            urls_by_key
                .remove(&doc.object_key)
                .map(|url| UploadUrl { id: doc.id, url })
        })
        .collect::<Vec<_>>();

    tracing::info!(user_id = user.user_id, count = urls.len(), "Documents registered for upload");

    Ok((
        StatusCode::CREATED,
        Json(WithMessage::new(
            "upload urls generated successfully",
            UploadUrls { urls },
        )),
    ))
}

/// PUT /v1/documents/finalize
///
/// Record which uploads succeeded and which failed.
pub async fn finalize(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FinalizeRequest>,
) -> AppResult<impl IntoResponse> {
    if input.successful.is_empty() && input.failed.is_empty() {
        return Err(AppError::BadRequest(
            "successful or failed must list at least one document".into(),
        ));
    }

    let updated =
        DocumentRepo::finalize(&state.pool, user.user_id, &input.successful, &input.failed)
            .await?;

    tracing::info!(
        user_id = user.user_id,
        successful = input.successful.len(),
        failed = input.failed.len(),
        updated,
        "Uploads finalized"
    );
    Ok(Json(MessageResponse::new("documents finalized successfully")))
}

/// GET /v1/documents/list
pub async fn list(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = params.resolve(DEFAULT_LIST_LIMIT);
    let (documents, total_count) =
        DocumentRepo::list_visible(&state.pool, user.user_id, limit, offset).await?;

    let message = if documents.is_empty() {
        "no documents found"
    } else {
        "documents fetched successfully"
    };
    Ok(Json(WithMessage::new(
        message,
        DocumentList {
            documents,
            total_count,
        },
    )))
}

/// DELETE /v1/documents/delete/{file_id}
///
/// Remove a document from the bucket and the registry. If the bucket
/// delete fails the row stays locked until the daily document sync.
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if file_id <= 0 {
        return Err(AppError::BadRequest("file_id is required".into()));
    }

    let ids = [file_id];
    let object_keys = match DocumentRepo::lock_for_deletion(&state.pool, user.user_id, &ids).await? {
        LockOutcome::InKnowledgeBase(_) => {
            return Err(CoreError::Conflict(
                "document is part of a knowledge base, remove it from the knowledge base first"
                    .into(),
            )
            .into());
        }
        LockOutcome::Locked(keys) if keys.is_empty() => {
            return Err(CoreError::NotFound {
                entity: "Document",
                id: file_id,
            }
            .into());
        }
        LockOutcome::Locked(keys) => keys,
    };

    state.object_store.delete_objects(&object_keys).await?;
    let deleted = DocumentRepo::delete_locked(&state.pool, user.user_id, &ids).await?;

    tracing::info!(user_id = user.user_id, file_id, deleted, "Document deleted");
    Ok(Json(MessageResponse::new("document deleted successfully")))
}
