//! Daily maintenance: vector index cleanup and document sync.
//!
//! Runs once a day at 08:03 UTC. The document sync repairs rows left
//! half-finished by abandoned uploads or failed deletions: if the object
//! is in the bucket the row becomes visible again, otherwise the row is
//! removed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use kbase_cloud::ObjectStore;
use kbase_db::repositories::DocumentRepo;
use kbase_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::provisioner::Provisioner;

const RUN_HOUR: u32 = 8;
const RUN_MINUTE: u32 = 3;

/// The first `hour:minute` UTC strictly after `now`.
pub fn next_daily_run(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Outcome of one document sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub restored: u64,
    pub removed: u64,
    /// Rows left for the next run because the bucket check failed.
    pub skipped: usize,
}

/// Reconcile documents stuck outside the visible state for longer than
/// `max_age` with the bucket.
///
/// A failed existence check only skips that row; the remaining decisions
/// are still applied.
pub async fn sync_documents(
    pool: &DbPool,
    store: &dyn ObjectStore,
    max_age: Duration,
) -> Result<SyncReport, sqlx::Error> {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
    let stale = DocumentRepo::list_stale(pool, Utc::now() - max_age).await?;
    if stale.is_empty() {
        tracing::debug!("Document sync: nothing to do");
        return Ok(SyncReport::default());
    }

    let mut restore = Vec::new();
    let mut remove = Vec::new();
    let mut skipped = 0;
    for doc in &stale {
        match store.object_exists(&doc.object_key).await {
            Ok(true) => restore.push(doc.id),
            Ok(false) => remove.push(doc.id),
            Err(e) => {
                tracing::warn!(
                    document_id = doc.id,
                    object_key = %doc.object_key,
                    error = %e,
                    "Document sync: existence check failed, skipping"
                );
                skipped += 1;
            }
        }
    }

    let counts = DocumentRepo::apply_sync(pool, &restore, &remove).await?;
    tracing::info!(
        restored = counts.restored,
        removed = counts.removed,
        skipped,
        "Document sync finished"
    );
    Ok(SyncReport {
        restored: counts.restored,
        removed: counts.removed,
        skipped,
    })
}

/// Run the daily maintenance loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    store: Arc<dyn ObjectStore>,
    provisioner: Provisioner,
    upload_expiry: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(hour = RUN_HOUR, minute = RUN_MINUTE, "Daily maintenance scheduled");

    loop {
        let now = Utc::now();
        let next = next_daily_run(now, RUN_HOUR, RUN_MINUTE);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(next_run = %next, "Waiting for daily maintenance");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Daily maintenance stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                match provisioner.cleanup().await {
                    Ok(removed) => tracing::info!(removed, "Maintenance: index cleanup done"),
                    Err(e) => tracing::error!(error = %e, "Maintenance: index cleanup failed"),
                }
                if let Err(e) = sync_documents(&pool, store.as_ref(), upload_expiry).await {
                    tracing::error!(error = %e, "Maintenance: document sync failed");
                }
            }
        }
    }
}
