//! AWS adapters for kbase.
//!
//! Each external service sits behind an `async_trait` so the API server can
//! run against in-memory implementations in tests:
//!
//! - [`ObjectStore`]: S3 bucket holding uploaded documents
//! - [`JobQueue`]: SQS queue feeding the ingestion engine
//! - [`VectorIndexStore`]: S3 Vectors bucket holding per-knowledge-base indexes

pub mod config;
pub mod error;
pub mod object_store;
pub mod queue;
pub mod vector_store;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use config::AwsConfig;
pub use error::CloudError;
pub use object_store::{ObjectStore, S3ObjectStore};
pub use queue::{JobQueue, SqsJobQueue};
pub use vector_store::{IndexSpec, S3VectorIndexStore, VectorIndexStore};

/// Build an SDK config from [`AwsConfig`].
///
/// Static credentials are used when both key id and secret are set;
/// otherwise the default provider chain applies.
pub async fn load_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
        let credentials = aws_credential_types::Credentials::new(
            key_id.clone(),
            secret.clone(),
            None,
            None,
            "kbase-env",
        );
        loader = loader.credentials_provider(credentials);
    }

    loader.load().await
}

/// Concrete AWS adapters sharing one SDK config.
#[derive(Clone)]
pub struct AwsServices {
    pub object_store: S3ObjectStore,
    pub queue: SqsJobQueue,
    pub vector_store: S3VectorIndexStore,
}

impl AwsServices {
    pub async fn connect(config: &AwsConfig) -> Self {
        let sdk = load_sdk_config(config).await;
        Self {
            object_store: S3ObjectStore::new(
                aws_sdk_s3::Client::new(&sdk),
                config.bucket_name.clone(),
                config.presigned_url_exp,
            ),
            queue: SqsJobQueue::new(aws_sdk_sqs::Client::new(&sdk), config.queue_url.clone()),
            vector_store: S3VectorIndexStore::new(
                aws_sdk_s3vectors::Client::new(&sdk),
                config.vector_bucket_name.clone(),
                config.vector_bucket_arn.clone(),
            ),
        }
    }
}
