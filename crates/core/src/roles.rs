//! Well-known role name constants.
//!
//! These must match the `client_role` enum in the initial migration.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_USER: &str = "USER";
