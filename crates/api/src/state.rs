use std::sync::Arc;

use kbase_cloud::{JobQueue, ObjectStore};

use crate::auth::TokenManager;
use crate::config::ServerConfig;
use crate::mail::Mailer;
use crate::provisioner::ProvisionerHandle;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: kbase_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Signs access tokens and API keys.
    pub tokens: Arc<TokenManager>,
    /// Document bucket.
    pub object_store: Arc<dyn ObjectStore>,
    /// Ingestion queue.
    pub queue: Arc<dyn JobQueue>,
    /// Nudges the index provisioner workers.
    pub provisioner: ProvisionerHandle,
    pub mailer: Arc<Mailer>,
}
