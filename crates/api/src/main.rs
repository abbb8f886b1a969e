use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kbase_api::cli::{self, Cli};
use kbase_api::config::ServerConfig;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Configuration ---
    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kbase: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let level_flag = cli
        .command
        .serve_args()
        .and_then(|args| args.log_level.clone());
    if let Some(args) = cli.command.serve_args() {
        args.apply(&mut config);
    }

    // --- Tracing ---
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = cli::resolve_log_filter(level_flag.as_deref(), rust_log.as_deref(), &config.log_level);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| EnvFilter::new(cli::log_directives(&config.log_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Runtime ---
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "Command failed");
            ExitCode::FAILURE
        }
    }
}
