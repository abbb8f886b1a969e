//! Symmetric signing-key material shared by access tokens and API keys.
//!
//! The active key is loaded from the `encryption_keys` table at startup.
//! Keys are addressed by their database id, which is embedded as `kid` in
//! every token and API key so verification can pick the right secret.

use std::collections::HashMap;

use rand::RngCore;

use crate::types::{DbId, Timestamp};

/// Length in bytes of a freshly generated signing key.
pub const SYMMETRIC_KEY_LENGTH: usize = 32;

/// Errors raised while resolving a signing key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("signing key {0} not found")]
    KeyNotFound(DbId),

    #[error("signing key {0} has expired")]
    KeyExpired(DbId),
}

/// A single signing key and its optional expiry.
#[derive(Debug, Clone)]
pub struct KeyInfo {
    pub key: Vec<u8>,
    pub expires_at: Option<Timestamp>,
}

impl KeyInfo {
    pub fn new(key: Vec<u8>, expires_at: Option<Timestamp>) -> Self {
        Self { key, expires_at }
    }

    /// A key without an expiry never expires.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now())
    }
}

/// The set of known signing keys plus the id of the one used for new
/// signatures.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    keys: HashMap<DbId, KeyInfo>,
    active_id: DbId,
}

impl SigningKeys {
    /// Build a key set containing only the active key.
    pub fn with_active(active_id: DbId, active: KeyInfo) -> Self {
        let mut keys = HashMap::new();
        keys.insert(active_id, active);
        Self { keys, active_id }
    }

    pub fn active_id(&self) -> DbId {
        self.active_id
    }

    /// The active key, if it is still valid.
    pub fn active(&self) -> Result<&KeyInfo, SigningError> {
        self.usable(self.active_id)
    }

    /// Look up a key by id and reject it if it has expired.
    pub fn usable(&self, kid: DbId) -> Result<&KeyInfo, SigningError> {
        let info = self.keys.get(&kid).ok_or(SigningError::KeyNotFound(kid))?;
        if info.is_expired() {
            return Err(SigningError::KeyExpired(kid));
        }
        Ok(info)
    }
}

/// Generate a new random symmetric signing key.
pub fn generate_symmetric_key() -> Vec<u8> {
    let mut key = vec![0u8; SYMMETRIC_KEY_LENGTH];
    rand::rng().fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn key_without_expiry_never_expires() {
        let info = KeyInfo::new(vec![1, 2, 3], None);
        assert!(!info.is_expired());
    }

    #[test]
    fn key_past_expiry_is_expired() {
        let info = KeyInfo::new(vec![1], Some(Utc::now() - Duration::minutes(1)));
        assert!(info.is_expired());
    }

    #[test]
    fn active_key_resolves() {
        let keys = SigningKeys::with_active(7, KeyInfo::new(vec![9; 32], None));
        assert_eq!(keys.active_id(), 7);
        assert_eq!(keys.active().unwrap().key, vec![9; 32]);
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let keys = SigningKeys::with_active(1, KeyInfo::new(vec![0; 32], None));
        assert_eq!(keys.usable(2).unwrap_err(), SigningError::KeyNotFound(2));
    }

    #[test]
    fn expired_active_key_is_rejected() {
        let expired = KeyInfo::new(vec![0; 32], Some(Utc::now() - Duration::hours(1)));
        let keys = SigningKeys::with_active(3, expired);
        assert_eq!(keys.active().unwrap_err(), SigningError::KeyExpired(3));
    }

    #[test]
    fn generated_keys_are_random_and_sized() {
        let a = generate_symmetric_key();
        let b = generate_symmetric_key();
        assert_eq!(a.len(), SYMMETRIC_KEY_LENGTH);
        assert_ne!(a, b);
    }
}
