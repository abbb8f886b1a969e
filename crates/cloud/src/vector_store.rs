//! Vector index lifecycle in an S3 Vectors bucket.

use async_trait::async_trait;
use aws_sdk_s3vectors::error::DisplayErrorContext;
use aws_sdk_s3vectors::types::{DataType, DistanceMetric, MetadataConfiguration};

use crate::error::CloudError;

/// Parameters for a new index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub index_name: String,
    pub dimension: i32,
    /// Metadata keys stored with vectors but excluded from filtering.
    pub non_filterable_metadata_keys: Vec<String>,
}

#[async_trait]
pub trait VectorIndexStore: Send + Sync {
    /// Create a float32 cosine index.
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), CloudError>;

    async fn delete_index(&self, index_arn: &str) -> Result<(), CloudError>;
}

/// [`VectorIndexStore`] backed by an S3 Vectors bucket.
#[derive(Clone)]
pub struct S3VectorIndexStore {
    client: aws_sdk_s3vectors::Client,
    bucket_name: String,
    bucket_arn: String,
}

impl S3VectorIndexStore {
    pub fn new(client: aws_sdk_s3vectors::Client, bucket_name: String, bucket_arn: String) -> Self {
        Self {
            client,
            bucket_name,
            bucket_arn,
        }
    }
}

#[async_trait]
impl VectorIndexStore for S3VectorIndexStore {
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), CloudError> {
        let metadata = MetadataConfiguration::builder()
            .set_non_filterable_metadata_keys(Some(spec.non_filterable_metadata_keys.clone()))
            .build()
            .map_err(|e| CloudError::vector_index("create", e))?;

        self.client
            .create_index()
            .vector_bucket_arn(&self.bucket_arn)
            .index_name(&spec.index_name)
            .data_type(DataType::Float32)
            .dimension(spec.dimension)
            .distance_metric(DistanceMetric::Cosine)
            .metadata_configuration(metadata)
            .send()
            .await
            .map_err(|e| CloudError::vector_index("create", DisplayErrorContext(e)))?;

        tracing::info!(index_name = %spec.index_name, "Created vector index");
        Ok(())
    }

    async fn delete_index(&self, index_arn: &str) -> Result<(), CloudError> {
        self.client
            .delete_index()
            .vector_bucket_name(&self.bucket_name)
            .index_arn(index_arn)
            .send()
            .await
            .map_err(|e| CloudError::vector_index("delete", DisplayErrorContext(e)))?;

        tracing::info!(index_arn, "Deleted vector index");
        Ok(())
    }
}
