#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("AWS configuration error: {0}")]
    Config(String),

    #[error("object storage {operation} failed: {message}")]
    ObjectStore {
        operation: &'static str,
        message: String,
    },

    #[error("batch delete failed for {} objects: {}", failed.len(), failed.join("; "))]
    BatchDelete { failed: Vec<String> },

    #[error("queue publish failed: {0}")]
    Queue(String),

    #[error("vector index {operation} failed: {message}")]
    VectorIndex {
        operation: &'static str,
        message: String,
    },
}

impl CloudError {
    pub(crate) fn object_store(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ObjectStore {
            operation,
            message: err.to_string(),
        }
    }

    pub(crate) fn vector_index(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::VectorIndex {
            operation,
            message: err.to_string(),
        }
    }
}
