//! Ingestion job rows.

use kbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{IngestionOperation, OperationStatus};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IngestionJob {
    pub id: DbId,
    pub user_id: DbId,
    pub knowledge_base_id: DbId,
    pub operation: IngestionOperation,
    pub status: OperationStatus,
    pub document_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A knowledge-base document selected for an ingestion request.
#[derive(Debug, Clone, FromRow)]
pub struct IngestionTarget {
    pub kb_doc_id: DbId,
    pub doc_id: DbId,
    pub file_name: String,
    pub object_key: String,
}

impl From<IngestionTarget> for kbase_core::ingestion::FileForIngestion {
    fn from(target: IngestionTarget) -> Self {
        Self {
            kb_doc_id: target.kb_doc_id,
            doc_id: target.doc_id,
            file_name: target.file_name,
            object_key: Some(target.object_key),
        }
    }
}
