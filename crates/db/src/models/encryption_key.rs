//! Signing-key rows.

use kbase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full row from `encryption_keys`. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct EncryptionKey {
    pub id: DbId,
    pub symmetric_key: Vec<u8>,
    pub is_active: bool,
    pub expired_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
