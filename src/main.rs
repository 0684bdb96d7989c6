use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lungscan::config::LungscanConfig;
use lungscan::http::{AppState, HttpServer};
use lungscan::ratelimit::{spawn_sweeper, RateLimiter};

#[derive(Parser, Debug)]
#[command(name = "lungscan", version)]
#[command(about = "API backend for the LungScan X-ray classification demo")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured HTTP listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    info!("Starting LungScan API Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &args.config {
        Some(path) => LungscanConfig::from_file(path)?,
        None => LungscanConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.http_addr = listen;
    }
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    // Initialize the rate limiter and its background sweep
    let rate_limiter = Arc::new(RateLimiter::new());
    let sweeper = spawn_sweeper(
        rate_limiter.clone(),
        Duration::from_secs(config.rate_limiting.sweep_interval_secs),
    );
    info!(
        sweep_interval_secs = config.rate_limiting.sweep_interval_secs,
        "Rate limiter initialized"
    );

    // Build the shared handler state
    let state = AppState::from_config(&config, rate_limiter)?;

    // Create and start the HTTP server
    let server = HttpServer::new(config.server.http_addr, state);

    info!("Starting HTTP server on {}", config.server.http_addr);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    sweeper.abort();
    info!("LungScan API Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
