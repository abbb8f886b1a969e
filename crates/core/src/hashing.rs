//! Shared SHA-256 digest helpers.

use sha2::{Digest, Sha256};

/// Compute the raw SHA-256 digest of the given bytes.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn raw_and_hex_digests_agree() {
        let data = b"hello world";
        assert_eq!(hex::encode(sha256(data)), sha256_hex(data));
        assert_eq!(sha256(data).len(), 32);
    }
}
