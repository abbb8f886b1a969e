//! Request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers delegate to the repositories in `kbase_db` and the cloud
//! adapters in `kbase_cloud`, mapping errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod documents;
pub mod ingestion;
pub mod knowledge_bases;
pub mod tokens;
pub mod users;
