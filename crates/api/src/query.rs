//! Shared query parameter types for API handlers.

use kbase_core::pagination::{clamp_limit, clamp_offset, MAX_LIMIT};
use kbase_core::types::DbId;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Clamped `(limit, offset)` with the given default page size.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        (
            clamp_limit(self.limit, default_limit, MAX_LIMIT),
            clamp_offset(self.offset),
        )
    }
}

/// Query parameters for `GET /kb/docs/list`.
#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseDocsParams {
    #[serde(default)]
    pub kb_id: DbId,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl KnowledgeBaseDocsParams {
    pub fn page(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}
