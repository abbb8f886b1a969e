//! Repository for the `documents_registry` table.
//!
//! A document is visible (listable, ingestible, deletable) only while it is
//! `(unlocked, SUCCESS)`. Uploads start `(locked, PENDING)`; deletion
//! re-locks the row before the object is removed from the bucket.

use kbase_core::types::{DbId, Timestamp};
use sqlx::{PgPool, QueryBuilder};

use crate::models::document::{Document, DocumentListItem, NewDocument, StaleDocument};
use crate::models::status::OperationStatus;

const COLUMNS: &str =
    "id, user_id, file_name, object_key, lock_status, op_status, created_at, updated_at";

/// Outcome of [`DocumentRepo::lock_for_deletion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The documents are referenced by a knowledge base.
    InKnowledgeBase(Vec<DbId>),
    /// Locked rows and their object keys (empty if nothing matched).
    Locked(Vec<String>),
}

/// Outcome of [`DocumentRepo::apply_sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub restored: u64,
    pub removed: u64,
}

/// Provides document registry operations.
pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents_registry WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Register pending uploads in a single statement. Rows come back in
    /// insertion order.
    pub async fn create_pending(
        pool: &PgPool,
        user_id: DbId,
        docs: &[NewDocument],
    ) -> Result<Vec<Document>, sqlx::Error> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO documents_registry (user_id, file_name, object_key, lock_status, op_status) ",
        );
        builder.push_values(docs, |mut row, doc| {
            row.push_bind(user_id)
                .push_bind(&doc.file_name)
                .push_bind(&doc.object_key)
                .push_bind(true)
                .push_bind(OperationStatus::Pending);
        });
        builder.push(format!(" RETURNING {COLUMNS}"));

        let mut created = builder.build_query_as::<Document>().fetch_all(pool).await?;
        created.sort_by_key(|d| d.id);
        Ok(created)
    }

    /// Mark the caller's locked documents as uploaded or failed and unlock
    /// them. Returns the number of rows changed.
    pub async fn finalize(
        pool: &PgPool,
        user_id: DbId,
        successful: &[DbId],
        failed: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE documents_registry \
             SET op_status = CASE WHEN id = ANY($2) THEN $4 ELSE $5 END, \
                 lock_status = false \
             WHERE user_id = $1 \
               AND lock_status \
               AND (id = ANY($2) OR id = ANY($3))",
        )
        .bind(user_id)
        .bind(successful)
        .bind(failed)
        .bind(OperationStatus::Success)
        .bind(OperationStatus::Failed)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List the caller's visible documents, with the total count.
    pub async fn list_visible(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<DocumentListItem>, i64), sqlx::Error> {
        let documents = sqlx::query_as::<_, DocumentListItem>(
            "SELECT id, file_name FROM documents_registry \
             WHERE user_id = $1 AND NOT lock_status AND op_status = $2 \
             ORDER BY id LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(OperationStatus::Success)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM documents_registry \
             WHERE user_id = $1 AND NOT lock_status AND op_status = $2",
        )
        .bind(user_id)
        .bind(OperationStatus::Success)
        .fetch_one(pool)
        .await?;

        Ok((documents, total.0))
    }

    /// Lock the caller's visible documents for deletion and return their
    /// object keys. Documents that belong to a knowledge base are refused.
    pub async fn lock_for_deletion(
        pool: &PgPool,
        user_id: DbId,
        ids: &[DbId],
    ) -> Result<LockOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let referenced: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT document_id FROM knowledge_base_documents \
             WHERE document_id = ANY($1) ORDER BY document_id",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;
        if !referenced.is_empty() {
            return Ok(LockOutcome::InKnowledgeBase(
                referenced.into_iter().map(|(id,)| id).collect(),
            ));
        }

        let keys: Vec<(String,)> = sqlx::query_as(
            "UPDATE documents_registry SET lock_status = true, op_status = $3 \
             WHERE user_id = $1 AND id = ANY($2) AND NOT lock_status AND op_status = $4 \
             RETURNING object_key",
        )
        .bind(user_id)
        .bind(ids)
        .bind(OperationStatus::Pending)
        .bind(OperationStatus::Success)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LockOutcome::Locked(keys.into_iter().map(|(k,)| k).collect()))
    }

    /// Delete the caller's documents that were locked for deletion.
    pub async fn delete_locked(
        pool: &PgPool,
        user_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM documents_registry \
             WHERE user_id = $1 AND id = ANY($2) AND lock_status AND op_status = $3",
        )
        .bind(user_id)
        .bind(ids)
        .bind(OperationStatus::Pending)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Documents stuck outside the visible state since before `cutoff`.
    pub async fn list_stale(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<StaleDocument>, sqlx::Error> {
        sqlx::query_as::<_, StaleDocument>(
            "SELECT id, object_key FROM documents_registry \
             WHERE NOT (NOT lock_status AND op_status = $1) AND updated_at < $2 \
             ORDER BY id",
        )
        .bind(OperationStatus::Success)
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Restore documents whose objects exist and remove the rest.
    pub async fn apply_sync(
        pool: &PgPool,
        restore: &[DbId],
        remove: &[DbId],
    ) -> Result<SyncCounts, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut counts = SyncCounts::default();

        if !remove.is_empty() {
            counts.removed = sqlx::query("DELETE FROM documents_registry WHERE id = ANY($1)")
                .bind(remove)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        if !restore.is_empty() {
            counts.restored = sqlx::query(
                "UPDATE documents_registry SET lock_status = false, op_status = $2 \
                 WHERE id = ANY($1)",
            )
            .bind(restore)
            .bind(OperationStatus::Success)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(counts)
    }
}
