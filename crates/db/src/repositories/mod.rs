//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool` (or an open transaction when the caller owns the transaction
//! boundary) as the first argument.

pub mod api_key_repo;
pub mod document_repo;
pub mod encryption_key_repo;
pub mod ingestion_repo;
pub mod knowledge_base_repo;
pub mod user_repo;
pub mod vector_index_repo;

pub use api_key_repo::ApiKeyRepo;
pub use document_repo::DocumentRepo;
pub use encryption_key_repo::EncryptionKeyRepo;
pub use ingestion_repo::IngestionRepo;
pub use knowledge_base_repo::KnowledgeBaseRepo;
pub use user_repo::UserRepo;
pub use vector_index_repo::VectorIndexRepo;
