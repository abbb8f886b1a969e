//! Document bucket access.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use std::time::Duration;

use crate::error::CloudError;

/// S3 caps `DeleteObjects` at 1000 keys per request.
const DELETE_BATCH_SIZE: usize = 1000;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presigned PUT URL for uploading `object_key` with the given content
    /// type.
    async fn presign_upload(&self, object_key: &str, content_type: &str)
        -> Result<String, CloudError>;

    /// Delete the given objects. Missing objects count as deleted. Returns
    /// the number of keys reported deleted.
    async fn delete_objects(&self, object_keys: &[String]) -> Result<usize, CloudError>;

    async fn object_exists(&self, object_key: &str) -> Result<bool, CloudError>;
}

/// [`ObjectStore`] backed by an S3 bucket.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    presign_expiry: Duration,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, presign_expiry: Duration) -> Self {
        Self {
            client,
            bucket,
            presign_expiry,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_upload(
        &self,
        object_key: &str,
        content_type: &str,
    ) -> Result<String, CloudError> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| CloudError::Config(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| CloudError::object_store("presign", DisplayErrorContext(e)))?;

        Ok(request.uri().to_string())
    }

    async fn delete_objects(&self, object_keys: &[String]) -> Result<usize, CloudError> {
        let mut deleted = 0;
        let mut failed = Vec::new();

        for chunk in object_keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CloudError::object_store("batch delete", e))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(false)
                .build()
                .map_err(|e| CloudError::object_store("batch delete", e))?;

            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| CloudError::object_store("batch delete", DisplayErrorContext(e)))?;

            deleted += output.deleted().len();
            for error in output.errors() {
                let detail = format!(
                    "key {}: {} {}",
                    error.key().unwrap_or("?"),
                    error.code().unwrap_or("Unknown"),
                    error.message().unwrap_or_default()
                );
                tracing::error!(bucket = %self.bucket, error = %detail, "Batch delete error");
                failed.push(detail);
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            deleted,
            errors = failed.len(),
            "Batch deletion completed",
        );

        if failed.is_empty() {
            Ok(deleted)
        } else {
            Err(CloudError::BatchDelete { failed })
        }
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool, CloudError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(CloudError::object_store(
                "existence check",
                DisplayErrorContext(err),
            )),
        }
    }
}
