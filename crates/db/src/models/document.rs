//! Document registry rows.

use kbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::OperationStatus;

/// Full row from `documents_registry`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub user_id: DbId,
    pub file_name: String,
    pub object_key: String,
    pub lock_status: bool,
    pub op_status: OperationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A document as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentListItem {
    pub id: DbId,
    pub file_name: String,
}

/// DTO for registering an upload.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub object_key: String,
}

/// Minimal shape needed by the document sync.
#[derive(Debug, Clone, FromRow)]
pub struct StaleDocument {
    pub id: DbId,
    pub object_key: String,
}
