//! Stored API key credentials.

use kbase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::ClientRole;

/// Full row from `api_keys`. Holds only the credential digest and the
/// signature, never the plaintext key.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKey {
    pub id: DbId,
    pub user_id: DbId,
    pub key_id: DbId,
    pub key_credential: Vec<u8>,
    pub key_signature: Vec<u8>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A key joined with its owner, as needed to authenticate a request.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyOwner {
    pub user_id: DbId,
    pub role: ClientRole,
    pub key_id: DbId,
    pub key_signature: Vec<u8>,
}

/// DTO for storing a freshly minted key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub key_id: DbId,
    pub credential: Vec<u8>,
    pub signature: Vec<u8>,
}

impl From<&kbase_core::api_keys::GeneratedApiKey> for NewApiKey {
    fn from(key: &kbase_core::api_keys::GeneratedApiKey) -> Self {
        Self {
            key_id: key.key_id,
            credential: key.credential.clone(),
            signature: key.signature.clone(),
        }
    }
}
