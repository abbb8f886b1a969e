//! API key minting and verification.
//!
//! An API key has the shape `<body>.<signature>` where `body` is 24 random
//! bytes and `signature` is `HMAC-SHA256(signing_key, "<kid>:<body>")`, both
//! base64url encoded without padding. The database stores the SHA-256 digest
//! of the whole key (for lookup) and the raw signature bytes (for a second,
//! server-side comparison), never the plaintext.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::signing::{SigningError, SigningKeys};
use crate::types::DbId;

/// Number of random bytes in the key body.
pub const KEY_BODY_BYTES: usize = 24;

/// Separator between the key body and its signature.
const SEPARATOR: char = '.';

type HmacSha256 = Hmac<Sha256>;

/// The result of minting a new API key.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// The plaintext key (shown to the user exactly once, never stored).
    pub plaintext: String,
    /// SHA-256 digest of the plaintext, stored for lookup.
    pub credential: Vec<u8>,
    /// Raw HMAC signature bytes, stored for verification.
    pub signature: Vec<u8>,
    /// Id of the signing key that produced the signature.
    pub key_id: DbId,
}

/// Mint a new API key signed with the active signing key.
pub fn generate_api_key(keys: &SigningKeys) -> Result<GeneratedApiKey, SigningError> {
    let key_id = keys.active_id();
    let signing_key = keys.active()?;

    let mut body_bytes = [0u8; KEY_BODY_BYTES];
    rand::rng().fill_bytes(&mut body_bytes);
    let body = URL_SAFE_NO_PAD.encode(body_bytes);

    let signature = sign(&signing_key.key, key_id, &body);
    let plaintext = format!("{body}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(&signature));

    Ok(GeneratedApiKey {
        credential: credential_digest(&plaintext),
        plaintext,
        signature,
        key_id,
    })
}

/// Digest under which a plaintext key is stored and looked up.
pub fn credential_digest(plaintext: &str) -> Vec<u8> {
    crate::hashing::sha256(plaintext.as_bytes())
}

/// Verify a presented API key against the signature stored for it.
///
/// Returns `Ok(false)` for malformed keys, unknown key ids and signature
/// mismatches. An expired signing key is an error so callers can tell a
/// rotation problem apart from a bad credential.
pub fn verify_api_key(
    keys: &SigningKeys,
    plaintext: &str,
    stored_signature: &[u8],
    kid: DbId,
) -> Result<bool, SigningError> {
    let Some((body, signature_b64)) = split_key(plaintext) else {
        return Ok(false);
    };

    // Unknown key ids are an ordinary authentication failure.
    let signing_key = match keys.usable(kid) {
        Ok(info) => info,
        Err(SigningError::KeyNotFound(_)) => return Ok(false),
        Err(e) => return Err(e),
    };

    let Ok(presented) = URL_SAFE_NO_PAD.decode(signature_b64) else {
        return Ok(false);
    };

    let presented_ok = mac_for(&signing_key.key, kid, body)
        .verify_slice(&presented)
        .is_ok();
    let stored_ok = mac_for(&signing_key.key, kid, body)
        .verify_slice(stored_signature)
        .is_ok();

    Ok(presented_ok && stored_ok)
}

fn split_key(plaintext: &str) -> Option<(&str, &str)> {
    let mut parts = plaintext.split(SEPARATOR);
    let body = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() || body.is_empty() || signature.is_empty() {
        return None;
    }
    Some((body, signature))
}

fn mac_for(key: &[u8], kid: DbId, body: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(format!("{kid}:{body}").as_bytes());
    mac
}

fn sign(key: &[u8], kid: DbId, body: &str) -> Vec<u8> {
    mac_for(key, kid, body).finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{KeyInfo, SigningKeys};
    use chrono::{Duration, Utc};

    fn keys() -> SigningKeys {
        SigningKeys::with_active(1, KeyInfo::new(vec![7u8; 32], None))
    }

    #[test]
    fn generated_key_has_body_and_signature() {
        let key = generate_api_key(&keys()).unwrap();
        let (body, sig) = key.plaintext.split_once('.').unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(body).unwrap().len(), KEY_BODY_BYTES);
        assert_eq!(URL_SAFE_NO_PAD.decode(sig).unwrap(), key.signature);
        assert_eq!(key.key_id, 1);
    }

    #[test]
    fn credential_is_digest_of_plaintext() {
        let key = generate_api_key(&keys()).unwrap();
        assert_eq!(key.credential, credential_digest(&key.plaintext));
        assert_eq!(key.credential.len(), 32);
    }

    #[test]
    fn generated_key_verifies() {
        let keys = keys();
        let key = generate_api_key(&keys).unwrap();
        assert!(verify_api_key(&keys, &key.plaintext, &key.signature, 1).unwrap());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let keys = keys();
        let key = generate_api_key(&keys).unwrap();
        let (_, sig) = key.plaintext.split_once('.').unwrap();
        let forged = format!("{}.{sig}", URL_SAFE_NO_PAD.encode([0u8; KEY_BODY_BYTES]));
        assert!(!verify_api_key(&keys, &forged, &key.signature, 1).unwrap());
    }

    #[test]
    fn mismatched_stored_signature_is_rejected() {
        let keys = keys();
        let key = generate_api_key(&keys).unwrap();
        assert!(!verify_api_key(&keys, &key.plaintext, &[0u8; 32], 1).unwrap());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let keys = keys();
        for bad in ["", "nodot", "a.b.c", ".sig", "body.", "body.!!!"] {
            assert!(!verify_api_key(&keys, bad, &[0u8; 32], 1).unwrap(), "{bad}");
        }
    }

    #[test]
    fn unknown_kid_is_rejected_without_error() {
        let keys = keys();
        let key = generate_api_key(&keys).unwrap();
        assert!(!verify_api_key(&keys, &key.plaintext, &key.signature, 99).unwrap());
    }

    #[test]
    fn expired_signing_key_is_an_error() {
        let live = keys();
        let key = generate_api_key(&live).unwrap();
        let expired = SigningKeys::with_active(
            1,
            KeyInfo::new(vec![7u8; 32], Some(Utc::now() - Duration::days(1))),
        );
        assert_eq!(
            verify_api_key(&expired, &key.plaintext, &key.signature, 1).unwrap_err(),
            SigningError::KeyExpired(1)
        );
        assert!(generate_api_key(&expired).is_err());
    }

    #[test]
    fn different_signing_keys_do_not_cross_verify() {
        let a = keys();
        let b = SigningKeys::with_active(1, KeyInfo::new(vec![8u8; 32], None));
        let key = generate_api_key(&a).unwrap();
        assert!(!verify_api_key(&b, &key.plaintext, &key.signature, 1).unwrap());
    }
}
