//! Domain building blocks for kbase with no I/O dependencies.
//!
//! Everything here is shared by the database layer, the cloud adapters and
//! the API server.

pub mod api_keys;
pub mod content_type;
pub mod error;
pub mod hashing;
pub mod ingestion;
pub mod naming;
pub mod pagination;
pub mod roles;
pub mod signing;
pub mod types;
