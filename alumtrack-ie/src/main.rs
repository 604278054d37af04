//! alumtrack-ie - alumni Import/Export microservice
//!
//! Port 5730 by default. Serves bulk spreadsheet import, xlsx export, record
//! and program administration, and an SSE notification stream.

use std::net::SocketAddr;
use std::path::PathBuf;

use alumtrack_common::config::{load_config_or_default, EmploymentNormalization, RootFolderInitializer, RootFolderResolver};
use alumtrack_common::db::init_database;
use alumtrack_common::events::EventBus;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use alumtrack_ie::{build_router, AppState};

/// Module name used for the config file and root folder logging
const MODULE_NAME: &str = "alumtrack-ie";

/// Events buffered per SSE client before the oldest are dropped
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for alumtrack-ie
#[derive(Parser, Debug)]
#[command(name = "alumtrack-ie")]
#[command(about = "Alumni spreadsheet Import/Export service")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides ALUMTRACK_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config dir>/alumtrack/alumtrack-ie.toml)
    #[arg(short, long, env = "ALUMTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides [server] host)
    #[arg(long, env = "ALUMTRACK_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "ALUMTRACK_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured level below
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting alumtrack-ie v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = load_config_or_default(MODULE_NAME, args.config.as_deref());
    if !rust_log_set {
        match EnvFilter::try_new(&config.logging.level) {
            Ok(level) => {
                if let Err(e) = filter_handle.reload(level) {
                    warn!("Could not apply log level '{}': {}", config.logging.level, e);
                }
            }
            Err(e) => warn!("Invalid logging.level '{}': {}", config.logging.level, e),
        }
    }

    if config.import.employment_normalization == EmploymentNormalization::UpdateOnly {
        warn!(
            "import.employment_normalization = \"update_only\": imported rows keep employment \
             details of non-employed alumni until their next update"
        );
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

    let host = args.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let state = AppState::new(pool, event_bus, config.import.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
