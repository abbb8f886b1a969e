//! User entity model and DTOs.

use kbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::ClientRole;

/// Full row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub role: ClientRole,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Entry in the admin user listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserListItem {
    pub id: DbId,
    pub email: String,
    pub role: ClientRole,
}
