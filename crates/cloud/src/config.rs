//! AWS settings loaded from the environment.

use std::time::Duration;

use crate::error::CloudError;

/// Default lifetime of a presigned upload URL, in seconds.
pub const DEFAULT_PRESIGNED_URL_EXP_SECS: u64 = 3600;

/// AWS configuration.
///
/// | Env var                  | Required | Default |
/// |--------------------------|----------|---------|
/// | `AWS_REGION`             | yes      |         |
/// | `AWS_ACCESS_KEY_ID`      | no       | provider chain |
/// | `AWS_SECRET_ACCESS_KEY`  | no       | provider chain |
/// | `AWS_BUCKET_NAME`        | yes      |         |
/// | `AWS_QUEUE_URL`          | yes      |         |
/// | `AWS_VECTOR_BUCKET_NAME` | yes      |         |
/// | `AWS_VECTOR_BUCKET_ARN`  | yes      |         |
/// | `AWS_PRESIGNED_URL_EXP`  | no       | `3600`  |
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: String,
    pub queue_url: String,
    pub vector_bucket_name: String,
    pub vector_bucket_arn: String,
    pub presigned_url_exp: Duration,
}

impl AwsConfig {
    pub fn from_env() -> Result<Self, CloudError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CloudError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CloudError::Config(format!("{name} must be set")))
        };
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let presigned_url_exp = match optional("AWS_PRESIGNED_URL_EXP") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                CloudError::Config(format!("AWS_PRESIGNED_URL_EXP must be seconds, got {raw:?}"))
            })?,
            None => DEFAULT_PRESIGNED_URL_EXP_SECS,
        };

        Ok(Self {
            region: required("AWS_REGION")?,
            access_key_id: optional("AWS_ACCESS_KEY_ID"),
            secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            bucket_name: required("AWS_BUCKET_NAME")?,
            queue_url: required("AWS_QUEUE_URL")?,
            vector_bucket_name: required("AWS_VECTOR_BUCKET_NAME")?,
            vector_bucket_arn: required("AWS_VECTOR_BUCKET_ARN")?,
            presigned_url_exp: Duration::from_secs(presigned_url_exp),
        })
    }
}
