//! Token issuance and verification.
//!
//! - [`jwt`] -- access-token claims and settings.
//! - [`token_manager`] -- signing with the active `encryption_keys` row.

pub mod jwt;
pub mod token_manager;

pub use token_manager::{TokenError, TokenManager};
