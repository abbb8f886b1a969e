//! Long-running provisioner loops.
//!
//! Both loops log cycle failures and keep going; they stop when `cancel`
//! fires or every trigger sender has been dropped.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Provisioner;

/// Keep the index pool topped up.
///
/// Runs one cycle immediately, then one per trigger or per
/// `reconcile_interval`, whichever comes first.
pub async fn run_reconciliation(
    provisioner: Provisioner,
    mut triggers: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let interval = provisioner.config().reconcile_interval;
    tracing::info!(interval_secs = interval.as_secs(), "Index reconciliation worker started");

    reconcile_cycle(&provisioner).await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            waited = tokio::time::timeout(interval, triggers.recv()) => {
                match waited {
                    Ok(Some(())) => drain(&mut triggers),
                    Ok(None) => {
                        tracing::warn!("Reconciliation trigger channel closed");
                        break;
                    }
                    Err(_) => tracing::debug!("Reconciliation interval elapsed"),
                }
            }
        }
        reconcile_cycle(&provisioner).await;
    }

    tracing::info!("Index reconciliation worker stopping");
}

/// Remove released, failed and stuck indexes whenever triggered.
pub async fn run_cleanup(
    provisioner: Provisioner,
    mut triggers: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    tracing::info!("Index cleanup worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = triggers.recv() => {
                if received.is_none() {
                    tracing::warn!("Cleanup trigger channel closed");
                    break;
                }
                drain(&mut triggers);
            }
        }

        if let Err(e) = provisioner.cleanup().await {
            tracing::error!(error = %e, "Index cleanup cycle failed");
        }
    }

    tracing::info!("Index cleanup worker stopping");
}

async fn reconcile_cycle(provisioner: &Provisioner) {
    if let Err(e) = provisioner.reconcile().await {
        tracing::error!(error = %e, "Index reconciliation cycle failed");
    }
}

fn drain(triggers: &mut mpsc::Receiver<()>) {
    while triggers.try_recv().is_ok() {}
}
