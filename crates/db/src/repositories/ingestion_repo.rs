//! Repository for `ingestion_jobs` and the membership updates that go with
//! them.
//!
//! [`IngestionRepo::prepare`] runs on a caller-owned transaction so the
//! caller can publish the queue message before committing and roll back if
//! publishing fails.

use kbase_core::ingestion::IngestionKind;
use kbase_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::ingestion_job::{IngestionJob, IngestionTarget};
use crate::models::status::{IngestionOperation, OperationStatus};
use crate::repositories::KnowledgeBaseRepo;

const COLUMNS: &str =
    "id, user_id, knowledge_base_id, operation, status, document_count, created_at, updated_at";

/// A prepared, not yet committed, ingestion request.
#[derive(Debug, Clone)]
pub struct PreparedIngestion {
    pub job: IngestionJob,
    pub index_arn: String,
    pub targets: Vec<IngestionTarget>,
}

/// Outcome of [`IngestionRepo::prepare`].
#[derive(Debug, Clone)]
pub enum PrepareOutcome {
    KnowledgeBaseNotFound,
    DocumentsNotFound,
    Prepared(PreparedIngestion),
}

/// Provides ingestion job bookkeeping.
pub struct IngestionRepo;

impl IngestionRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<IngestionJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ingestion_jobs WHERE id = $1");
        sqlx::query_as::<_, IngestionJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark the requested memberships `PENDING` and record a job.
    ///
    /// For inserts, memberships are created as needed. For deletes, only
    /// existing memberships are touched. Only the caller's visible
    /// documents are considered.
    pub async fn prepare(
        conn: &mut PgConnection,
        user_id: DbId,
        kb_id: DbId,
        document_ids: &[DbId],
        kind: IngestionKind,
    ) -> Result<PrepareOutcome, sqlx::Error> {
        let Some((kb_id, index_arn)) =
            KnowledgeBaseRepo::find_for_user_with_index(&mut *conn, user_id, kb_id).await?
        else {
            return Ok(PrepareOutcome::KnowledgeBaseNotFound);
        };

        let touched = match kind {
            IngestionKind::Insert => {
                sqlx::query(
                    "INSERT INTO knowledge_base_documents (knowledge_base_id, document_id, status) \
                     SELECT $1, d.id, $4 FROM documents_registry d \
                     WHERE d.user_id = $2 AND d.id = ANY($3) \
                       AND NOT d.lock_status AND d.op_status = $5 \
                     ON CONFLICT (knowledge_base_id, document_id) \
                     DO UPDATE SET status = EXCLUDED.status",
                )
                .bind(kb_id)
                .bind(user_id)
                .bind(document_ids)
                .bind(OperationStatus::Pending)
                .bind(OperationStatus::Success)
                .execute(&mut *conn)
                .await?
            }
            IngestionKind::Delete => {
                sqlx::query(
                    "UPDATE knowledge_base_documents kbd SET status = $4 \
                     FROM documents_registry d \
                     WHERE kbd.document_id = d.id AND kbd.knowledge_base_id = $1 \
                       AND d.user_id = $2 AND d.id = ANY($3) \
                       AND NOT d.lock_status AND d.op_status = $5",
                )
                .bind(kb_id)
                .bind(user_id)
                .bind(document_ids)
                .bind(OperationStatus::Pending)
                .bind(OperationStatus::Success)
                .execute(&mut *conn)
                .await?
            }
        };
        if touched.rows_affected() == 0 {
            return Ok(PrepareOutcome::DocumentsNotFound);
        }

        let targets = sqlx::query_as::<_, IngestionTarget>(
            "SELECT kbd.id AS kb_doc_id, d.id AS doc_id, d.file_name, d.object_key \
             FROM knowledge_base_documents kbd \
             JOIN documents_registry d ON d.id = kbd.document_id \
             WHERE kbd.knowledge_base_id = $1 AND d.user_id = $2 AND d.id = ANY($3) \
               AND NOT d.lock_status AND d.op_status = $4 \
             ORDER BY d.id",
        )
        .bind(kb_id)
        .bind(user_id)
        .bind(document_ids)
        .bind(OperationStatus::Success)
        .fetch_all(&mut *conn)
        .await?;

        let query = format!(
            "INSERT INTO ingestion_jobs (user_id, knowledge_base_id, operation, document_count) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, IngestionJob>(&query)
            .bind(user_id)
            .bind(kb_id)
            .bind(IngestionOperation::from(kind))
            .bind(targets.len() as i32)
            .fetch_one(&mut *conn)
            .await?;

        Ok(PrepareOutcome::Prepared(PreparedIngestion {
            job,
            index_arn,
            targets,
        }))
    }
}
