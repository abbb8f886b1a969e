//! Knowledge base and membership rows.

use kbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::OperationStatus;

/// Full row from `knowledge_bases`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeBase {
    pub id: DbId,
    pub user_id: DbId,
    pub index_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A knowledge base as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeBaseListItem {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// A caller's document together with its membership in one knowledge base.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnowledgeBaseDocument {
    pub doc_id: DbId,
    pub kb_doc_id: DbId,
    pub file_name: String,
    pub status: OperationStatus,
}
