//! Bootstrap initialization (`kbase init`).
//!
//! Safe to run repeatedly: each step checks before it creates.

use std::time::Duration;

use anyhow::Context;
use kbase_core::signing::generate_symmetric_key;
use kbase_core::types::DbId;
use kbase_db::models::api_key::NewApiKey;
use kbase_db::models::status::ClientRole;
use kbase_db::repositories::{EncryptionKeyRepo, UserRepo};
use kbase_db::{DbPool, PoolConfig};

use crate::auth::TokenManager;
use crate::config::ServerConfig;
use crate::mail::{EmailConfig, Mailer};

/// How many times to try reaching the database before giving up.
pub const DB_WAIT_ATTEMPTS: u32 = 300;
/// Pause between database connection attempts.
pub const DB_WAIT_INTERVAL: Duration = Duration::from_secs(3);

pub async fn run(config: &ServerConfig, database_url: &str) -> anyhow::Result<()> {
    // Required: user registration needs an admin token.
    let email = config
        .first_admin
        .as_deref()
        .context("FIRST_ADMIN must be set to the email of the first administrator")?;

    let pool = wait_for_database(
        database_url,
        &PoolConfig::from_env(),
        DB_WAIT_ATTEMPTS,
        DB_WAIT_INTERVAL,
    )
    .await
    .context("database did not become reachable")?;

    let key_id = ensure_signing_key(&pool)
        .await
        .context("failed to ensure an active signing key")?;
    tracing::info!(key_id, "Signing key ready");

    let tokens = TokenManager::load(&pool, config.jwt.clone())
        .await
        .context("failed to load signing key")?;
    let mailer = Mailer::new(
        EmailConfig::from_env().context("invalid SMTP configuration")?,
        config.project_name.clone(),
    );

    ensure_first_admin(&pool, &tokens, &mailer, email)
        .await
        .context("failed to create the first admin")?;

    tracing::info!("Initialization finished");
    Ok(())
}

/// Connect and run `SELECT 1` until it succeeds or `attempts` run out.
pub async fn wait_for_database(
    database_url: &str,
    pool_config: &PoolConfig,
    attempts: u32,
    interval: Duration,
) -> Result<DbPool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        let result = match kbase_db::create_pool(database_url, pool_config).await {
            Ok(pool) => kbase_db::health_check(&pool).await.map(|()| pool),
            Err(e) => Err(e),
        };

        match result {
            Ok(pool) => {
                tracing::info!(attempt, "Database is reachable");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                tracing::info!(attempt, max_attempts = attempts, error = %e, "Database not ready, retrying");
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "Database not reachable, giving up");
                return Err(e);
            }
        }
    }
}

/// Return the active signing key id, creating a key if none is active.
pub async fn ensure_signing_key(pool: &DbPool) -> Result<DbId, sqlx::Error> {
    if let Some(active) = EncryptionKeyRepo::find_active(pool).await? {
        tracing::debug!(key_id = active.id, "Active signing key present");
        return Ok(active.id);
    }
    let created = EncryptionKeyRepo::create_active(pool, &generate_symmetric_key()).await?;
    tracing::info!(key_id = created.id, "Created signing key");
    Ok(created.id)
}

/// Create the administrator `email` with an API key unless the account
/// exists. Returns `true` when a user was created.
pub async fn ensure_first_admin(
    pool: &DbPool,
    tokens: &TokenManager,
    mailer: &Mailer,
    email: &str,
) -> anyhow::Result<bool> {
    if let Some(existing) = UserRepo::find_by_email(pool, email).await? {
        tracing::info!(user_id = existing.id, "First admin already exists");
        return Ok(false);
    }

    let generated = tokens.generate_api_key()?;
    let admin =
        UserRepo::create_with_key(pool, email, ClientRole::Admin, &NewApiKey::from(&generated))
            .await?;
    tracing::info!(user_id = admin.id, "Created first admin");

    mailer.send_api_key(&admin.email, &generated.plaintext).await;
    Ok(true)
}
