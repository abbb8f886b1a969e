//! The HTTP server process (`kbase serve`).

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use kbase_cloud::{AwsConfig, AwsServices};
use kbase_db::PoolConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenManager;
use crate::background::maintenance;
use crate::config::ServerConfig;
use crate::mail::{EmailConfig, Mailer};
use crate::provisioner::{workers, Provisioner, ProvisionerHandle};
use crate::router::build_app_router;
use crate::state::AppState;

/// How long each background task gets to stop after shutdown begins.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(config: ServerConfig, database_url: &str) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.host,
        port = config.port,
        environment = %config.environment,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = kbase_db::create_pool(database_url, &PoolConfig::from_env())
        .await
        .context("failed to connect to the database")?;
    kbase_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    tracing::info!("Database connection pool created");

    // --- Signing keys ---
    let tokens = TokenManager::load(&pool, config.jwt.clone())
        .await
        .context("failed to load signing keys")?;
    tracing::info!(key_id = tokens.active_key_id(), "Signing key loaded");

    // --- Cloud adapters ---
    let aws = AwsConfig::from_env().context("invalid AWS configuration")?;
    let services = AwsServices::connect(&aws).await;
    tracing::info!(region = %aws.region, bucket = %aws.bucket_name, "AWS clients ready");

    let mailer = Mailer::new(
        EmailConfig::from_env().context("invalid SMTP configuration")?,
        config.project_name.clone(),
    );
    if !mailer.is_enabled() {
        tracing::warn!("SMTP_HOST not set, API keys will not be mailed");
    }

    // --- Background workers ---
    let provisioner = Provisioner::new(
        pool.clone(),
        Arc::new(services.vector_store),
        aws.vector_bucket_arn.clone(),
        config.provisioner.clone(),
    );
    let (handle, triggers) = ProvisionerHandle::channel();
    let object_store: Arc<dyn kbase_cloud::ObjectStore> = Arc::new(services.object_store);

    let cancel = CancellationToken::new();
    let tasks: Vec<(&'static str, JoinHandle<()>)> = vec![
        (
            "index reconciliation",
            tokio::spawn(workers::run_reconciliation(
                provisioner.clone(),
                triggers.reconcile,
                cancel.clone(),
            )),
        ),
        (
            "index cleanup",
            tokio::spawn(workers::run_cleanup(
                provisioner.clone(),
                triggers.cleanup,
                cancel.clone(),
            )),
        ),
        (
            "daily maintenance",
            tokio::spawn(maintenance::run(
                pool.clone(),
                Arc::clone(&object_store),
                provisioner,
                aws.presigned_url_exp,
                cancel.clone(),
            )),
        ),
    ];

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        tokens: Arc::new(tokens),
        object_store,
        queue: Arc::new(services.queue),
        provisioner: handle,
        mailer: Arc::new(mailer),
    };
    let app = build_app_router(state, &config).context("failed to build router")?;

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Starting server");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping background tasks");
    cancel.cancel();
    for (name, task) in tasks {
        match tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => tracing::info!(task = name, "Background task stopped"),
            Ok(Err(e)) => tracing::error!(task = name, error = %e, "Background task panicked"),
            Err(_) => tracing::warn!(task = name, "Background task did not stop in time"),
        }
    }

    served.context("server error")?;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
