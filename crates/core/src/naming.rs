//! Vector index naming.
//!
//! S3 Vectors index names must be lowercase, so generated names draw from
//! `[a-z0-9]` only.

use rand::Rng;

/// Length of a generated index name.
pub const INDEX_NAME_LEN: usize = 16;

const INDEX_NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random index name.
pub fn random_index_name() -> String {
    let mut rng = rand::rng();
    (0..INDEX_NAME_LEN)
        .map(|_| INDEX_NAME_ALPHABET[rng.random_range(0..INDEX_NAME_ALPHABET.len())] as char)
        .collect()
}

/// Build the ARN of an index inside a vector bucket.
///
/// ```
/// use kbase_core::naming::index_arn;
///
/// assert_eq!(
///     index_arn("arn:aws:s3vectors:us-east-1:123:bucket/kb", "abc"),
///     "arn:aws:s3vectors:us-east-1:123:bucket/kb/index/abc"
/// );
/// ```
pub fn index_arn(bucket_arn: &str, index_name: &str) -> String {
    format!("{}/index/{index_name}", bucket_arn.trim_end_matches('/'))
}
