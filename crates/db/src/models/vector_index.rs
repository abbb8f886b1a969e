//! Vector index pool rows.

use kbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::ProvisionerStatus;

/// Full row from `vector_indexes`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VectorIndex {
    pub id: DbId,
    pub index_name: String,
    pub index_arn: String,
    pub bucket_arn: String,
    pub status: ProvisionerStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Pool counters used by reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct PoolStats {
    pub available: i64,
    pub provisioning: i64,
}

impl PoolStats {
    /// Indexes that count toward the pool target.
    pub fn usable(&self) -> i64 {
        self.available + self.provisioning
    }
}
