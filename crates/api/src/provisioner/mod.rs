//! Vector index pool management.
//!
//! Knowledge bases are created on pre-provisioned indexes so creation never
//! waits on S3 Vectors. [`Provisioner::reconcile`] keeps at least
//! `min_pool` indexes `AVAILABLE` or freshly `PROVISIONING`;
//! [`Provisioner::cleanup`] removes indexes that were released, failed, or
//! got stuck mid-provisioning.

pub mod trigger;
pub mod workers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kbase_cloud::{CloudError, IndexSpec, VectorIndexStore};
use kbase_core::naming::{index_arn, random_index_name};
use kbase_core::types::{DbId, Timestamp};
use kbase_db::models::status::ProvisionerStatus;
use kbase_db::models::vector_index::VectorIndex;
use kbase_db::repositories::VectorIndexRepo;
use kbase_db::DbPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{lookup_var, parse_var, ConfigError};

pub use trigger::{ProvisionerHandle, Triggers};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Provisioner tuning.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Target number of usable indexes.
    pub min_pool: usize,
    /// Maximum concurrent create/delete calls.
    pub max_concurrency: usize,
    pub embedding_dimension: i32,
    pub non_filterable_metadata_key: String,
    /// `PROVISIONING` rows older than this are considered stuck.
    pub stuck_threshold: chrono::Duration,
    /// Reconciliation runs at least this often.
    pub reconcile_interval: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            min_pool: 3,
            max_concurrency: 2,
            embedding_dimension: 1024,
            non_filterable_metadata_key: "source_text".into(),
            stuck_threshold: chrono::Duration::minutes(10),
            reconcile_interval: Duration::from_secs(300),
        }
    }
}

impl ProvisionerConfig {
    /// | Env Var                        | Default       |
    /// |--------------------------------|---------------|
    /// | `MIN_INDEX_POOL`               | `3`           |
    /// | `MAX_INDEX_PROVISIONER`        | `2`           |
    /// | `EMBEDDING_DIMENSION`          | `1024`        |
    /// | `NON_FILTERABLE_METADATA_KEY`  | `source_text` |
    /// | `INDEX_STUCK_THRESHOLD_MINS`   | `10`          |
    /// | `RECONCILE_INTERVAL_SECS`      | `300`         |
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_concurrency: usize =
            parse_var(lookup, "MAX_INDEX_PROVISIONER", defaults.max_concurrency)?;
        if max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_INDEX_PROVISIONER",
                value: "0".into(),
            });
        }

        Ok(Self {
            min_pool: parse_var(lookup, "MIN_INDEX_POOL", defaults.min_pool)?,
            max_concurrency,
            embedding_dimension: parse_var(
                lookup,
                "EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            )?,
            non_filterable_metadata_key: lookup_var(lookup, "NON_FILTERABLE_METADATA_KEY")
                .unwrap_or(defaults.non_filterable_metadata_key),
            stuck_threshold: chrono::Duration::minutes(parse_var(
                lookup,
                "INDEX_STUCK_THRESHOLD_MINS",
                10i64,
            )?),
            reconcile_interval: Duration::from_secs(parse_var(
                lookup,
                "RECONCILE_INTERVAL_SECS",
                defaults.reconcile_interval.as_secs(),
            )?),
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProvisionerError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("vector index {0} disappeared before it could be marked available")]
    Vanished(DbId),

    #[error("{failed} of {total} operations failed: {}", errors.join("; "))]
    Aggregate {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// Number of indexes to create so the pool reaches `min_pool`.
pub fn deficit(min_pool: usize, usable: i64) -> usize {
    let min_pool = i64::try_from(min_pool).unwrap_or(i64::MAX);
    usize::try_from((min_pool - usable).max(0)).unwrap_or(0)
}

#[derive(Clone)]
pub struct Provisioner {
    pool: DbPool,
    store: Arc<dyn VectorIndexStore>,
    bucket_arn: String,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(
        pool: DbPool,
        store: Arc<dyn VectorIndexStore>,
        bucket_arn: impl Into<String>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            pool,
            store,
            bucket_arn: bucket_arn.into(),
            config,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    fn stuck_cutoff(&self) -> Timestamp {
        Utc::now() - self.config.stuck_threshold
    }

    /// Top the pool up to `min_pool`. Returns the number of indexes created.
    ///
    /// Every requested index is attempted even when some fail; failures are
    /// reported together.
    pub async fn reconcile(&self) -> Result<usize, ProvisionerError> {
        let stats = VectorIndexRepo::pool_stats(&self.pool, self.stuck_cutoff()).await?;
        let needed = deficit(self.config.min_pool, stats.usable());

        if needed == 0 {
            tracing::debug!(
                available = stats.available,
                provisioning = stats.provisioning,
                "Index pool is full"
            );
            return Ok(0);
        }

        tracing::info!(
            available = stats.available,
            provisioning = stats.provisioning,
            needed,
            "Provisioning vector indexes"
        );

        let jobs = (0..needed).map(|_| {
            let this = self.clone();
            async move { this.provision_one().await }
        });
        let errors = run_bounded(self.config.max_concurrency, jobs).await;

        if !errors.is_empty() {
            return Err(ProvisionerError::Aggregate {
                failed: errors.len(),
                total: needed,
                errors,
            });
        }
        tracing::info!(created = needed, "Index reconciliation finished");
        Ok(needed)
    }

    /// Create one index and record it as `AVAILABLE`.
    ///
    /// The row is inserted as `PROVISIONING` first; if the index cannot be
    /// created the row is deleted again.
    pub async fn provision_one(&self) -> Result<DbId, ProvisionerError> {
        let name = random_index_name();
        let arn = index_arn(&self.bucket_arn, &name);

        let row =
            VectorIndexRepo::create_provisioning(&self.pool, &name, &arn, &self.bucket_arn).await?;

        let spec = IndexSpec {
            index_name: name.clone(),
            dimension: self.config.embedding_dimension,
            non_filterable_metadata_keys: vec![self.config.non_filterable_metadata_key.clone()],
        };

        if let Err(e) = self.store.create_index(&spec).await {
            tracing::error!(index_name = %name, error = %e, "Vector index creation failed");
            match VectorIndexRepo::delete(&self.pool, row.id).await {
                Ok(_) => tracing::info!(index_id = row.id, "Rolled back provisioning row"),
                Err(db_err) => tracing::error!(
                    index_id = row.id,
                    error = %db_err,
                    "Failed to roll back provisioning row"
                ),
            }
            return Err(e.into());
        }

        if !VectorIndexRepo::set_status(&self.pool, row.id, ProvisionerStatus::Available).await? {
            return Err(ProvisionerError::Vanished(row.id));
        }

        tracing::info!(index_id = row.id, index_name = %name, "Vector index available");
        Ok(row.id)
    }

    /// Delete released, failed and stuck indexes from the vector bucket and
    /// then from the database. Returns the number removed.
    pub async fn cleanup(&self) -> Result<usize, ProvisionerError> {
        let indexes = VectorIndexRepo::list_for_cleanup(&self.pool, self.stuck_cutoff()).await?;
        if indexes.is_empty() {
            tracing::debug!("No vector indexes to clean up");
            return Ok(0);
        }

        let total = indexes.len();
        tracing::info!(total, "Cleaning up vector indexes");

        let jobs = indexes.into_iter().map(|index| {
            let this = self.clone();
            async move { this.cleanup_one(index).await }
        });
        let errors = run_bounded(self.config.max_concurrency, jobs).await;

        if !errors.is_empty() {
            return Err(ProvisionerError::Aggregate {
                failed: errors.len(),
                total,
                errors,
            });
        }
        tracing::info!(removed = total, "Vector index cleanup finished");
        Ok(total)
    }

    async fn cleanup_one(&self, index: VectorIndex) -> Result<(), ProvisionerError> {
        self.store.delete_index(&index.index_arn).await?;

        if let Err(e) = VectorIndexRepo::delete(&self.pool, index.id).await {
            tracing::error!(
                index_id = index.id,
                index_arn = %index.index_arn,
                error = %e,
                "Index deleted from bucket but its row remains"
            );
            return Err(e.into());
        }

        tracing::info!(index_id = index.id, status = ?index.status, "Vector index removed");
        Ok(())
    }
}

/// Run `jobs` with at most `limit` in flight, collecting error messages.
async fn run_bounded<T, F>(limit: usize, jobs: impl IntoIterator<Item = F>) -> Vec<String>
where
    F: Future<Output = Result<T, ProvisionerError>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();

    for job in jobs {
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed.
            let _permit = semaphore.acquire_owned().await;
            job.await
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => errors.push(e.to_string()),
            Err(e) => errors.push(format!("task failed: {e}")),
        }
    }
    errors
}
