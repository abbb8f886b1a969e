//! Row structs and DTOs.
//!
//! Each submodule holds a `FromRow` struct matching its table plus the
//! serializable shapes returned to API clients.

pub mod api_key;
pub mod document;
pub mod encryption_key;
pub mod ingestion_job;
pub mod knowledge_base;
pub mod status;
pub mod user;
pub mod vector_index;
