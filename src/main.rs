mod build;
mod capture;
mod catalog;
mod config;
mod health;
mod http;
mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::build::{BuildRunner, CommandRunner};
use crate::config::Config;
use crate::metrics::MetricsRegistry;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "prebid-bundler", about = "Custom Prebid.js bundle builder", version)]
struct Cli {
    /// Path to the YAML configuration file.  Built-in defaults apply when
    /// omitted.
    #[arg(short, long, env = "PREBID_BUNDLER_CONFIG")]
    config: Option<PathBuf>,

    /// Override `server.http_listen`.
    #[arg(short, long, env = "PREBID_BUNDLER_LISTEN")]
    listen: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: MetricsRegistry,
    /// Runs the external build tool.
    pub runner: Arc<dyn BuildRunner>,
    /// Limits concurrent builds when `build.max_concurrent_builds` is set.
    pub build_semaphore: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, runner: Arc<dyn BuildRunner>) -> Self {
        let build_semaphore = config
            .build
            .max_concurrent_builds
            .map(|limit| Arc::new(Semaphore::new(limit)));
        Self {
            config,
            metrics: MetricsRegistry::new(),
            runner,
            build_semaphore,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP server (axum)
// ---------------------------------------------------------------------------

async fn run_http_server(state: AppState) -> Result<()> {
    let listen_addr: std::net::SocketAddr = state
        .config
        .server
        .http_listen
        .parse()
        .context("invalid http_listen address")?;

    let app = http::handler::create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Config ----
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    if let Some(listen) = cli.listen {
        config.server.http_listen = listen;
    }
    config::validate_config(&config)?;
    let config = Arc::new(config);

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        config_path = ?cli.config,
        prebid_root = %config.build.prebid_root.display(),
        command = %config.build.command,
        max_concurrent_builds = ?config.build.max_concurrent_builds,
        "starting prebid-bundler"
    );

    // ---- App state ----
    let state = AppState::new(Arc::clone(&config), Arc::new(CommandRunner));

    run_http_server(state).await?;

    tracing::info!("prebid-bundler shut down cleanly");
    Ok(())
}
