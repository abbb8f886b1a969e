//! Repository for `knowledge_bases` and their document memberships.

use kbase_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::knowledge_base::{KnowledgeBase, KnowledgeBaseDocument, KnowledgeBaseListItem};
use crate::models::status::{OperationStatus, ProvisionerStatus};

const COLUMNS: &str = "id, user_id, index_id, name, created_at, updated_at";

/// Provides knowledge base lifecycle operations.
pub struct KnowledgeBaseRepo;

impl KnowledgeBaseRepo {
    /// Claim a random `AVAILABLE` index and create a knowledge base on it.
    ///
    /// Concurrent callers never claim the same index (`SKIP LOCKED`).
    /// Returns `None` when the pool is empty.
    pub async fn create_on_available_index(
        pool: &PgPool,
        user_id: DbId,
        name: &str,
    ) -> Result<Option<KnowledgeBase>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let index: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM vector_indexes \
             WHERE status = $1 \
             ORDER BY random() \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(ProvisionerStatus::Available)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((index_id,)) = index else {
            return Ok(None);
        };

        sqlx::query("UPDATE vector_indexes SET status = $2 WHERE id = $1")
            .bind(index_id)
            .bind(ProvisionerStatus::Assigned)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO knowledge_bases (user_id, index_id, name) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let kb = sqlx::query_as::<_, KnowledgeBase>(&query)
            .bind(user_id)
            .bind(index_id)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(kb))
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<KnowledgeBaseListItem>, i64), sqlx::Error> {
        let items = sqlx::query_as::<_, KnowledgeBaseListItem>(
            "SELECT id, name, created_at FROM knowledge_bases \
             WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM knowledge_bases WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok((items, total.0))
    }

    /// The caller's visible documents that are members of `kb_id`.
    pub async fn list_documents(
        pool: &PgPool,
        user_id: DbId,
        kb_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<KnowledgeBaseDocument>, i64), sqlx::Error> {
        let docs = sqlx::query_as::<_, KnowledgeBaseDocument>(
            "SELECT d.id AS doc_id, kbd.id AS kb_doc_id, d.file_name, kbd.status \
             FROM documents_registry d \
             JOIN knowledge_base_documents kbd ON kbd.document_id = d.id \
             WHERE d.user_id = $1 AND kbd.knowledge_base_id = $2 \
               AND NOT d.lock_status AND d.op_status = $3 \
             ORDER BY d.id LIMIT $4 OFFSET $5",
        )
        .bind(user_id)
        .bind(kb_id)
        .bind(OperationStatus::Success)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) \
             FROM documents_registry d \
             JOIN knowledge_base_documents kbd ON kbd.document_id = d.id \
             WHERE d.user_id = $1 AND kbd.knowledge_base_id = $2 \
               AND NOT d.lock_status AND d.op_status = $3",
        )
        .bind(user_id)
        .bind(kb_id)
        .bind(OperationStatus::Success)
        .fetch_one(pool)
        .await?;

        Ok((docs, total.0))
    }

    /// Look up a caller's knowledge base and the ARN of its index, locking
    /// the knowledge base row for the rest of the transaction.
    pub async fn find_for_user_with_index(
        conn: &mut PgConnection,
        user_id: DbId,
        kb_id: DbId,
    ) -> Result<Option<(DbId, String)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, String)>(
            "SELECT kb.id, vi.index_arn \
             FROM knowledge_bases kb \
             JOIN vector_indexes vi ON vi.id = kb.index_id \
             WHERE kb.id = $1 AND kb.user_id = $2 \
             FOR UPDATE OF kb",
        )
        .bind(kb_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Delete a caller's knowledge base and hand its index to cleanup.
    /// Returns `false` when no such knowledge base belongs to the caller.
    pub async fn delete_for_user(
        pool: &PgPool,
        user_id: DbId,
        kb_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let kb: Option<(DbId,)> = sqlx::query_as(
            "SELECT index_id FROM knowledge_bases WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(kb_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((index_id,)) = kb else {
            return Ok(false);
        };

        sqlx::query("UPDATE vector_indexes SET status = $2 WHERE id = $1")
            .bind(index_id)
            .bind(ProvisionerStatus::Cleanup)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM knowledge_base_documents WHERE knowledge_base_id = $1")
            .bind(kb_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM knowledge_bases WHERE id = $1")
            .bind(kb_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
