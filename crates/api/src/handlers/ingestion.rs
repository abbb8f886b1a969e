//! Ingestion request handlers.
//!
//! A request marks knowledge-base memberships `PENDING`, records an
//! ingestion job and publishes one message for the ingestion engine. The
//! database changes are committed only after the message is accepted by
//! the queue.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kbase_core::error::CoreError;
use kbase_core::ingestion::{FileForIngestion, IngestionKind, IngestionMessage};
use kbase_core::types::DbId;
use kbase_db::repositories::ingestion_repo::PrepareOutcome;
use kbase_db::repositories::IngestionRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::WithMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestionRequest {
    #[serde(default)]
    pub kb_id: Option<DbId>,
    #[serde(default)]
    pub file_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct IngestionAccepted {
    pub ingestion_job_id: DbId,
}

/// POST /v1/ingestion/insert
pub async fn insert(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<IngestionRequest>,
) -> AppResult<impl IntoResponse> {
    let job_id = submit(&state, &user, input, IngestionKind::Insert).await?;
    Ok((
        StatusCode::CREATED,
        Json(WithMessage::new(
            "ingestion job submitted successfully",
            IngestionAccepted {
                ingestion_job_id: job_id,
            },
        )),
    ))
}

/// DELETE /v1/ingestion/delete
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<IngestionRequest>,
) -> AppResult<impl IntoResponse> {
    let job_id = submit(&state, &user, input, IngestionKind::Delete).await?;
    Ok(Json(WithMessage::new(
        "deletion job submitted successfully",
        IngestionAccepted {
            ingestion_job_id: job_id,
        },
    )))
}

async fn submit(
    state: &AppState,
    user: &AuthUser,
    input: IngestionRequest,
    kind: IngestionKind,
) -> AppResult<DbId> {
    let kb_id = input
        .kb_id
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("kb_id is required".into()))?;
    if input.file_ids.is_empty() {
        return Err(AppError::BadRequest("file_ids must not be empty".into()));
    }

    let mut tx = state.pool.begin().await?;

    let prepared =
        match IngestionRepo::prepare(&mut tx, user.user_id, kb_id, &input.file_ids, kind).await? {
            PrepareOutcome::Prepared(prepared) => prepared,
            PrepareOutcome::KnowledgeBaseNotFound => {
                return Err(CoreError::NotFound {
                    entity: "KnowledgeBase",
                    id: kb_id,
                }
                .into());
            }
            PrepareOutcome::DocumentsNotFound => {
                return Err(AppError::Core(CoreError::NotFound {
                    entity: "Document",
                    id: input.file_ids[0],
                }));
            }
        };

    let job_id = prepared.job.id;
    let files = prepared
        .targets
        .into_iter()
        .map(FileForIngestion::from)
        .collect::<Vec<_>>();
    let document_count = files.len();
    let message = IngestionMessage::new(kind, job_id, files, prepared.index_arn, kb_id, user.user_id)
        .to_json()
        .map_err(|e| AppError::InternalError(format!("failed to encode ingestion message: {e}")))?;

    if let Err(e) = state.queue.publish(&message).await {
        tracing::error!(job_id, kb_id, error = %e, "Ingestion message rejected by queue");
        tx.rollback().await?;
        return Err(CoreError::Unavailable(
            "ingestion queue is unavailable, try again later".into(),
        )
        .into());
    }

    tx.commit().await?;

    tracing::info!(
        user_id = user.user_id,
        kb_id,
        job_id,
        document_count,
        operation = ?kind,
        "Ingestion job submitted"
    );
    Ok(job_id)
}
