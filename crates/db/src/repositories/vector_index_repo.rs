//! Repository for the `vector_indexes` pool.

use kbase_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::status::ProvisionerStatus;
use crate::models::vector_index::{PoolStats, VectorIndex};

const COLUMNS: &str = "id, index_name, index_arn, bucket_arn, status, created_at, updated_at";

/// Provides pool bookkeeping for the provisioner.
pub struct VectorIndexRepo;

impl VectorIndexRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VectorIndex>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM vector_indexes WHERE id = $1");
        sqlx::query_as::<_, VectorIndex>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count `AVAILABLE` indexes and `PROVISIONING` ones created after
    /// `stuck_cutoff`. Older provisioning rows are treated as stuck.
    pub async fn pool_stats(pool: &PgPool, stuck_cutoff: Timestamp) -> Result<PoolStats, sqlx::Error> {
        sqlx::query_as::<_, PoolStats>(
            "SELECT \
                COUNT(*) FILTER (WHERE status = $1) AS available, \
                COUNT(*) FILTER (WHERE status = $2 AND created_at >= $3) AS provisioning \
             FROM vector_indexes",
        )
        .bind(ProvisionerStatus::Available)
        .bind(ProvisionerStatus::Provisioning)
        .bind(stuck_cutoff)
        .fetch_one(pool)
        .await
    }

    /// Record an index that is about to be created.
    pub async fn create_provisioning(
        pool: &PgPool,
        index_name: &str,
        index_arn: &str,
        bucket_arn: &str,
    ) -> Result<VectorIndex, sqlx::Error> {
        let query = format!(
            "INSERT INTO vector_indexes (index_name, index_arn, bucket_arn, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VectorIndex>(&query)
            .bind(index_name)
            .bind(index_arn)
            .bind(bucket_arn)
            .bind(ProvisionerStatus::Provisioning)
            .fetch_one(pool)
            .await
    }

    /// Move an index to a new status. Returns `false` if the row is gone.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ProvisionerStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE vector_indexes SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vector_indexes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Indexes to reclaim: `FAILED`, `CLEANUP`, and `PROVISIONING` rows
    /// created before `stuck_cutoff`, excluding any still referenced by a
    /// knowledge base.
    pub async fn list_for_cleanup(
        pool: &PgPool,
        stuck_cutoff: Timestamp,
    ) -> Result<Vec<VectorIndex>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM vector_indexes vi \
             WHERE (vi.status IN ($1, $2) OR (vi.status = $3 AND vi.created_at < $4)) \
               AND NOT EXISTS (SELECT 1 FROM knowledge_bases kb WHERE kb.index_id = vi.id) \
             ORDER BY vi.id"
        );
        sqlx::query_as::<_, VectorIndex>(&query)
            .bind(ProvisionerStatus::Failed)
            .bind(ProvisionerStatus::Cleanup)
            .bind(ProvisionerStatus::Provisioning)
            .bind(stuck_cutoff)
            .fetch_all(pool)
            .await
    }
}
