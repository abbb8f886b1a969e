//! Command-line interface of the `kbase` binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kbase_db::migrate;
use kbase_db::{PoolConfig, MIGRATOR};

use crate::config::{database_url, ServerConfig};
use crate::ops::{self, Step};
use crate::server;

#[derive(Debug, Parser)]
#[command(name = "kbase")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Knowledge base management service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage database schema migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Wait for the database, ensure a signing key and the first admin
    Init,
    /// Fill the vector index pool once
    Prime,
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Migrate, initialize, then serve; stops at the first failure
    Start(ServeArgs),
}

#[derive(Debug, Subcommand)]
pub enum MigrateAction {
    /// Create an empty reversible migration
    New {
        /// Free-form description, snake_cased into the file name
        description: String,
        /// Directory the migration files are written to
        #[arg(long, default_value = "crates/db/migrations")]
        dir: PathBuf,
    },
    /// Apply pending migrations
    Up {
        /// Stop after this version
        #[arg(long)]
        target: Option<i64>,
    },
    /// Revert the latest migration, or everything newer than --target
    Down {
        #[arg(long)]
        target: Option<i64>,
    },
    /// Show applied and pending migrations
    Status,
}

/// Server flags. Each overrides the matching environment variable.
#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Bind address [env: HOST, default: 127.0.0.1]
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port [env: PORT, default: 8000]
    #[arg(long)]
    pub port: Option<u16>,
    /// Tokio worker threads [env: WORKERS, default: CPU count]
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,
    /// Log level for kbase and its HTTP layer; wins over RUST_LOG, which
    /// wins over LOG_LEVEL [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(workers) = self.workers.filter(|w| *w > 0) {
            config.workers = Some(workers);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

impl Command {
    pub fn serve_args(&self) -> Option<&ServeArgs> {
        match self {
            Command::Serve(args) | Command::Start(args) => Some(args),
            _ => None,
        }
    }
}

/// Tracing directives enabling `level` for the service's own crates.
pub fn log_directives(level: &str) -> String {
    format!("kbase_api={level},kbase_db={level},kbase_cloud={level},tower_http={level}")
}

/// Pick the tracing filter: an explicit `--log-level` first, then
/// `RUST_LOG`, then the configured `LOG_LEVEL`.
pub fn resolve_log_filter(flag: Option<&str>, rust_log: Option<&str>, configured: &str) -> String {
    match (flag, rust_log.map(str::trim).filter(|v| !v.is_empty())) {
        (Some(level), _) => log_directives(level),
        (None, Some(env)) => env.to_string(),
        (None, None) => log_directives(configured),
    }
}

/// Run a parsed command. `config` already has flag overrides applied.
pub async fn execute(command: Command, config: ServerConfig) -> anyhow::Result<()> {
    match command {
        Command::Migrate { action } => run_migration(action).await,
        Command::Init => ops::init::run(&config, &database_url()?).await,
        Command::Prime => ops::prime::run(&config, &database_url()?).await,
        Command::Serve(_) => server::run(config, &database_url()?).await,
        Command::Start(_) => start(config).await,
    }
}

async fn start(config: ServerConfig) -> anyhow::Result<()> {
    let url = database_url()?;
    let init_config = config.clone();
    let (init_url, serve_url) = (url.clone(), url.clone());

    ops::run_steps(vec![
        Step::new("migrate up", move || async move {
            run_migration_on(&url, MigrateAction::Up { target: None }).await
        }),
        Step::new("init", move || async move {
            ops::init::run(&init_config, &init_url).await
        }),
        Step::new("serve", move || async move { server::run(config, &serve_url).await }),
    ])
    .await
}

async fn run_migration(action: MigrateAction) -> anyhow::Result<()> {
    if let MigrateAction::New { description, dir } = &action {
        let (up, down) = migrate::new_migration(dir, description, chrono::Utc::now())
            .context("failed to create migration")?;
        tracing::info!(up = %up.display(), down = %down.display(), "Created migration");
        return Ok(());
    }
    run_migration_on(&database_url()?, action).await
}

async fn run_migration_on(database_url: &str, action: MigrateAction) -> anyhow::Result<()> {
    let pool = kbase_db::create_pool(database_url, &PoolConfig::from_env())
        .await
        .context("failed to connect to the database")?;

    match action {
        MigrateAction::Up { target } => {
            let applied = migrate::up(&pool, &MIGRATOR, target)
                .await
                .context("migrate up failed")?;
            tracing::info!(count = applied.len(), "Migrations applied");
        }
        MigrateAction::Down { target } => {
            let reverted = migrate::down(&pool, &MIGRATOR, target)
                .await
                .context("migrate down failed")?;
            tracing::info!(count = reverted.len(), "Migrations reverted");
        }
        MigrateAction::Status => {
            let report = migrate::status(&pool, &MIGRATOR)
                .await
                .context("migrate status failed")?;
            for m in &report.migrations {
                let state = if m.applied { "applied" } else { "pending" };
                tracing::info!(version = m.version, description = %m.description, state, "Migration");
            }
            tracing::info!(current_version = ?report.current_version, "Current schema version");
            if !report.unknown_applied.is_empty() {
                anyhow::bail!(
                    "database has applied migrations missing from this build: {:?}",
                    report.unknown_applied
                );
            }
        }
        MigrateAction::New { .. } => {
            anyhow::bail!("migration files are created without a database connection")
        }
    }
    Ok(())
}
