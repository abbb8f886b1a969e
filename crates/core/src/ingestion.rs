//! Queue message consumed by the ingestion engine.
//!
//! One message is published per ingestion request. Exactly one of
//! `index_kb_doc_id` (documents to embed) and `delete_kb_doc_id` (documents
//! to remove from the index) is set.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A knowledge-base document the engine should act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileForIngestion {
    pub kb_doc_id: DbId,
    pub doc_id: DbId,
    pub file_name: String,
    #[serde(default)]
    pub object_key: Option<String>,
}

/// Whether an ingestion request adds or removes documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionKind {
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionMessage {
    pub ingestion_job_id: DbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_kb_doc_id: Option<Vec<FileForIngestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_kb_doc_id: Option<Vec<FileForIngestion>>,
    pub index_arn: String,
    pub kb_id: DbId,
    pub user_id: DbId,
}

impl IngestionMessage {
    pub fn new(
        kind: IngestionKind,
        ingestion_job_id: DbId,
        files: Vec<FileForIngestion>,
        index_arn: String,
        kb_id: DbId,
        user_id: DbId,
    ) -> Self {
        let (index_kb_doc_id, delete_kb_doc_id) = match kind {
            IngestionKind::Insert => (Some(files), None),
            IngestionKind::Delete => (None, Some(files)),
        };
        Self {
            ingestion_job_id,
            index_kb_doc_id,
            delete_kb_doc_id,
            index_arn,
            kb_id,
            user_id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
