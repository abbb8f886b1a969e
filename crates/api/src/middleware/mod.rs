//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- user from a JWT Bearer token.
//! - [`auth::ApiKeyUser`] -- user from an `X-API-Key` header.
//! - [`rbac::RequireAdmin`] -- requires the `ADMIN` role.

pub mod auth;
pub mod rbac;
