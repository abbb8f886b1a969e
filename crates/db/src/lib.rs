//! PostgreSQL access for kbase: pool setup, embedded migrations, models and
//! repositories.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod migrate;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Reversible migrations compiled into the binary.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection pool tuning.
///
/// | Env var                    | Default |
/// |----------------------------|---------|
/// | `DB_MAX_CONNECTIONS`       | `20`    |
/// | `DB_ACQUIRE_TIMEOUT_SECS`  | `30`    |
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Read pool settings from the environment, falling back to defaults for
    /// unset or unparseable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_connections);
        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);
        Self {
            max_connections,
            acquire_timeout,
        }
    }
}

/// Create a connection pool from a database URL.
///
/// Sessions are pinned to UTC so `TIMESTAMPTZ` comparisons against `NOW()`
/// agree with the application clock.
pub async fn create_pool(database_url: &str, config: &PoolConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("SET TIME ZONE 'UTC'").execute(conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Run a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
