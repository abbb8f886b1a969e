//! Access-token claims and JWT settings.

use kbase_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::config::{lookup_var, parse_var, ConfigError};

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: DbId,
    /// Role name as stored in `client_role` (`"ADMIN"` or `"USER"`).
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier, 16 random bytes hex encoded.
    pub jti: String,
}

/// Configuration for access-token issuance and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    /// Access token lifetime in hours (default: 24).
    pub access_token_hours: i64,
}

/// Default access token lifetime in hours.
const DEFAULT_ACCESS_TOKEN_HOURS: i64 = 24;

/// Longest accepted access token lifetime: one year.
pub const MAX_ACCESS_TOKEN_HOURS: i64 = 24 * 365;

impl JwtConfig {
    /// Load JWT configuration.
    ///
    /// | Env Var                  | Default     |
    /// |--------------------------|-------------|
    /// | `JWT_ISSUER`             | `kbase`     |
    /// | `JWT_AUDIENCE`           | `kbase-api` |
    /// | `JWT_ACCESS_TOKEN_HOURS` | `24`        |
    ///
    /// The lifetime must lie in `1..=MAX_ACCESS_TOKEN_HOURS`.
    ///
    /// The signing secret is not configured here; it is the active row of
    /// `encryption_keys`.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let access_token_hours =
            parse_var(lookup, "JWT_ACCESS_TOKEN_HOURS", DEFAULT_ACCESS_TOKEN_HOURS)?;
        if !(1..=MAX_ACCESS_TOKEN_HOURS).contains(&access_token_hours) {
            return Err(ConfigError::Invalid {
                name: "JWT_ACCESS_TOKEN_HOURS",
                value: access_token_hours.to_string(),
            });
        }

        Ok(Self {
            issuer: lookup_var(lookup, "JWT_ISSUER").unwrap_or_else(|| "kbase".into()),
            audience: lookup_var(lookup, "JWT_AUDIENCE").unwrap_or_else(|| "kbase-api".into()),
            access_token_hours,
        })
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "kbase".into(),
            audience: "kbase-api".into(),
            access_token_hours: DEFAULT_ACCESS_TOKEN_HOURS,
        }
    }
}
