//! Coalescing triggers for the provisioner workers.
//!
//! Each channel has capacity one: while a trigger is pending, further
//! triggers are dropped because the pending one already covers them.

use tokio::sync::mpsc::{self, error::TrySendError};

/// Sending half, cloned into [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct ProvisionerHandle {
    reconcile: mpsc::Sender<()>,
    cleanup: mpsc::Sender<()>,
}

/// Receiving halves, consumed by the workers.
#[derive(Debug)]
pub struct Triggers {
    pub reconcile: mpsc::Receiver<()>,
    pub cleanup: mpsc::Receiver<()>,
}

impl ProvisionerHandle {
    pub fn channel() -> (Self, Triggers) {
        let (reconcile_tx, reconcile_rx) = mpsc::channel(1);
        let (cleanup_tx, cleanup_rx) = mpsc::channel(1);
        (
            Self {
                reconcile: reconcile_tx,
                cleanup: cleanup_tx,
            },
            Triggers {
                reconcile: reconcile_rx,
                cleanup: cleanup_rx,
            },
        )
    }

    /// Ask the reconciliation worker to top up the index pool.
    pub fn trigger_reconciliation(&self) -> bool {
        send(&self.reconcile, "reconciliation")
    }

    /// Ask the cleanup worker to remove released indexes.
    pub fn trigger_cleanup(&self) -> bool {
        send(&self.cleanup, "cleanup")
    }
}

/// Returns `true` if a new trigger was queued.
fn send(tx: &mpsc::Sender<()>, worker: &'static str) -> bool {
    match tx.try_send(()) {
        Ok(()) => {
            tracing::debug!(worker, "Provisioner trigger sent");
            true
        }
        Err(TrySendError::Full(())) => {
            tracing::info!(worker, "Provisioner trigger already pending");
            false
        }
        Err(TrySendError::Closed(())) => {
            tracing::warn!(worker, "Provisioner worker is not running");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_coalesce_while_pending() {
        let (handle, mut triggers) = ProvisionerHandle::channel();

        assert!(handle.trigger_reconciliation());
        assert!(!handle.trigger_reconciliation());
        assert!(handle.trigger_cleanup());

        assert!(triggers.reconcile.try_recv().is_ok());
        assert!(triggers.reconcile.try_recv().is_err());
        assert!(handle.trigger_reconciliation());
    }

    #[test]
    fn trigger_after_worker_exit_is_dropped() {
        let (handle, triggers) = ProvisionerHandle::channel();
        drop(triggers);
        assert!(!handle.trigger_cleanup());
    }
}
