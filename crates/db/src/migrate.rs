//! Schema migration operations behind the `kbase migrate` commands.
//!
//! Migrations are reversible pairs embedded in [`crate::MIGRATOR`]. Versions
//! are UTC timestamps (`YYYYMMDDHHMMSS`), so source order is version order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::migrate::{Migrate, MigrateError, Migration, Migrator};

use crate::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("unknown migration version {0}")]
    UnknownTarget(i64),

    #[error("applied migration {0} was modified after it was applied")]
    ChecksumMismatch(i64),

    #[error("migration {0} is partially applied; fix it by hand before continuing")]
    Dirty(i64),

    #[error("migration description must contain at least one letter or digit")]
    EmptyDescription,

    #[error("migration file {0} already exists")]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One known migration and whether it has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub version: i64,
    pub description: String,
    pub applied: bool,
}

/// Result of [`status`].
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub migrations: Vec<MigrationState>,
    /// Highest applied version, if any.
    pub current_version: Option<i64>,
    /// Versions recorded as applied that have no source migration.
    pub unknown_applied: Vec<i64>,
}

fn up_migrations(migrator: &Migrator) -> impl Iterator<Item = &Migration> {
    migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
}

fn knows_version(migrator: &Migrator, version: i64) -> bool {
    up_migrations(migrator).any(|m| m.version == version)
}

async fn applied_versions(
    conn: &mut sqlx::PgConnection,
) -> Result<HashMap<i64, Vec<u8>>, MigrationError> {
    conn.ensure_migrations_table().await?;
    if let Some(version) = conn.dirty_version().await? {
        return Err(MigrationError::Dirty(version));
    }
    Ok(conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| (m.version, m.checksum.into_owned()))
        .collect())
}

/// Apply pending migrations in version order, stopping after `target` when
/// given. Returns the versions that were applied.
pub async fn up(
    pool: &DbPool,
    migrator: &Migrator,
    target: Option<i64>,
) -> Result<Vec<i64>, MigrationError> {
    if let Some(target) = target {
        if !knows_version(migrator, target) {
            return Err(MigrationError::UnknownTarget(target));
        }
    }

    let mut conn = pool.acquire().await?;
    conn.lock().await?;
    let result = apply_pending(&mut conn, migrator, target).await;
    conn.unlock().await?;
    result
}

async fn apply_pending(
    conn: &mut sqlx::PgConnection,
    migrator: &Migrator,
    target: Option<i64>,
) -> Result<Vec<i64>, MigrationError> {
    let applied = applied_versions(conn).await?;
    let mut newly_applied = Vec::new();

    for migration in up_migrations(migrator) {
        if target.is_some_and(|t| migration.version > t) {
            break;
        }
        match applied.get(&migration.version) {
            Some(checksum) if checksum.as_slice() != &*migration.checksum => {
                return Err(MigrationError::ChecksumMismatch(migration.version));
            }
            Some(_) => {}
            None => {
                let elapsed = conn.apply(migration).await?;
                tracing::info!(
                    version = migration.version,
                    description = %migration.description,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Applied migration",
                );
                newly_applied.push(migration.version);
            }
        }
    }

    if newly_applied.is_empty() {
        tracing::info!("No pending migrations");
    }
    Ok(newly_applied)
}

/// Revert applied migrations newer than `target`. Without a target, revert
/// only the most recently applied migration. Returns the reverted versions.
pub async fn down(
    pool: &DbPool,
    migrator: &Migrator,
    target: Option<i64>,
) -> Result<Vec<i64>, MigrationError> {
    if let Some(target) = target {
        if target != 0 && !knows_version(migrator, target) {
            return Err(MigrationError::UnknownTarget(target));
        }
    }

    let applied: Vec<i64> = {
        let mut conn = pool.acquire().await?;
        let mut versions: Vec<i64> = applied_versions(&mut conn).await?.into_keys().collect();
        versions.sort_unstable();
        versions
    };

    let Some(&latest) = applied.last() else {
        tracing::info!("No applied migrations to revert");
        return Ok(Vec::new());
    };

    let target = target.unwrap_or_else(|| previous_version(&applied, latest));
    let reverted: Vec<i64> = applied.iter().rev().copied().filter(|v| *v > target).collect();
    if reverted.is_empty() {
        tracing::info!(target, "Already at or below target version");
        return Ok(reverted);
    }

    migrator.undo(pool, target).await?;
    for version in &reverted {
        tracing::info!(version, "Reverted migration");
    }
    Ok(reverted)
}

/// The applied version just below `latest`, or `0` when `latest` is the only
/// one.
fn previous_version(applied: &[i64], latest: i64) -> i64 {
    applied
        .iter()
        .copied()
        .filter(|v| *v < latest)
        .max()
        .unwrap_or(0)
}

/// Report every known migration with its applied state.
pub async fn status(pool: &DbPool, migrator: &Migrator) -> Result<MigrationReport, MigrationError> {
    let mut conn = pool.acquire().await?;
    let applied = applied_versions(&mut conn).await?;
    Ok(build_report(migrator, &applied))
}

fn build_report(migrator: &Migrator, applied: &HashMap<i64, Vec<u8>>) -> MigrationReport {
    let migrations: Vec<MigrationState> = up_migrations(migrator)
        .map(|m| MigrationState {
            version: m.version,
            description: m.description.to_string(),
            applied: applied.contains_key(&m.version),
        })
        .collect();

    let mut unknown_applied: Vec<i64> = applied
        .keys()
        .copied()
        .filter(|v| !knows_version(migrator, *v))
        .collect();
    unknown_applied.sort_unstable();

    MigrationReport {
        migrations,
        current_version: applied.keys().copied().max(),
        unknown_applied,
    }
}

/// Turn a free-form description into a file-name-safe snake_case slug.
pub fn slugify_description(description: &str) -> Result<String, MigrationError> {
    let mut slug = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        return Err(MigrationError::EmptyDescription);
    }
    Ok(slug)
}

/// Create an empty reversible migration pair in `dir`.
///
/// Returns the `(up, down)` paths.
pub fn new_migration(
    dir: &Path,
    description: &str,
    now: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf), MigrationError> {
    let slug = slugify_description(description)?;
    let version = now.format("%Y%m%d%H%M%S");
    let up = dir.join(format!("{version}_{slug}.up.sql"));
    let down = dir.join(format!("{version}_{slug}.down.sql"));

    for path in [&up, &down] {
        if path.exists() {
            return Err(MigrationError::AlreadyExists(path.clone()));
        }
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&up, format!("-- {description}\n"))?;
    std::fs::write(&down, format!("-- Revert: {description}\n"))?;
    Ok((up, down))
}
