use std::str::FromStr;

use crate::auth::jwt::JwtConfig;
use crate::provisioner::ProvisionerConfig;

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Read a variable, treating blank values as unset.
pub(crate) fn lookup_var(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_var<T: FromStr>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup_var(lookup, name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// Command-line flags override the values read here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Tokio worker threads; `None` uses one per CPU.
    pub workers: Option<usize>,
    /// Default tracing filter directive.
    pub log_level: String,
    /// Deployment environment name (`development`, `production`, ...).
    pub environment: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Product name used in outgoing mail.
    pub project_name: String,
    /// Email of the administrator created by `kbase init`.
    pub first_admin: Option<String>,
    pub jwt: JwtConfig,
    pub provisioner: ProvisionerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `127.0.0.1`                |
    /// | `PORT`                 | `8000`                     |
    /// | `WORKERS`              | CPU count                  |
    /// | `ENVIRONMENT`          | `production`               |
    /// | `LOG_LEVEL`            | `debug` in development, else `info` |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PROJECT_NAME`         | `kbase`                    |
    /// | `FIRST_ADMIN`          | unset                      |
    ///
    /// `RUST_LOG`, when set, overrides `LOG_LEVEL`. `FIRST_ADMIN` is
    /// required by `kbase init`.
    ///
    /// JWT and provisioner settings are documented on [`JwtConfig`] and
    /// [`ProvisionerConfig`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment =
            lookup_var(lookup, "ENVIRONMENT").unwrap_or_else(|| "production".to_string());
        let default_level = if environment == "development" {
            "debug"
        } else {
            "info"
        };

        let workers = match lookup_var(lookup, "WORKERS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ConfigError::Invalid {
                        name: "WORKERS",
                        value: raw,
                    })?,
            ),
            None => None,
        };

        let cors_origins = lookup_var(lookup, "CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: lookup_var(lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(lookup, "PORT", DEFAULT_PORT)?,
            workers,
            log_level: lookup_var(lookup, "LOG_LEVEL").unwrap_or_else(|| default_level.into()),
            environment,
            cors_origins,
            request_timeout_secs: parse_var(lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            project_name: lookup_var(lookup, "PROJECT_NAME").unwrap_or_else(|| "kbase".into()),
            first_admin: lookup_var(lookup, "FIRST_ADMIN"),
            jwt: JwtConfig::from_lookup(lookup)?,
            provisioner: ProvisionerConfig::from_lookup(lookup)?,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// `DATABASE_URL`, which every command needs.
pub fn database_url() -> Result<String, ConfigError> {
    lookup_var(&|name| std::env::var(name).ok(), "DATABASE_URL")
        .ok_or(ConfigError::Missing("DATABASE_URL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_bind_to_localhost_8000() {
        let config = ServerConfig::from_lookup(&lookup(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.workers, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert!(config.first_admin.is_none());
    }

    #[test]
    fn development_defaults_to_debug_logging() {
        let config = ServerConfig::from_lookup(&lookup(&[("ENVIRONMENT", "development")])).unwrap();
        assert!(config.is_development());
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn explicit_log_level_wins() {
        let config = ServerConfig::from_lookup(&lookup(&[
            ("ENVIRONMENT", "development"),
            ("LOG_LEVEL", "warn"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_port_is_reported() {
        assert_matches!(
            ServerConfig::from_lookup(&lookup(&[("PORT", "eighty")])),
            Err(ConfigError::Invalid { name: "PORT", .. })
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert_matches!(
            ServerConfig::from_lookup(&lookup(&[("WORKERS", "0")])),
            Err(ConfigError::Invalid { name: "WORKERS", .. })
        );
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = ServerConfig::from_lookup(&lookup(&[(
            "CORS_ORIGINS",
            "https://a.example, https://b.example,,",
        )]))
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }
}
