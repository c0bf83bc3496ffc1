//! rockettrack-daemon - Rocket Telemetry Tracking Service
//!
//! Binary entry point: parses flags, loads configuration, initializes
//! logging, builds the registry and serves the API until SIGTERM/SIGINT.
//!
//! The Prometheus metrics endpoint runs on its own localhost-only
//! listener so the API port can be exposed without also exposing
//! operational internals.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rockettrack_core::RocketRegistry;
use rockettrack_daemon::config::ServerConfig;
use rockettrack_daemon::metrics::{SharedMetricsRegistry, new_shared_registry};
use rockettrack_daemon::routes::{self, AppState};

/// rockettrack daemon - rocket telemetry tracking service
#[derive(Parser, Debug)]
#[command(name = "rockettrack-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to server configuration file
    #[arg(short, long, default_value = "rockettrack.toml")]
    config: PathBuf,

    /// Socket address to serve the API on (overrides config)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Port for the Prometheus metrics endpoint (overrides config)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Disable the Prometheus metrics endpoint
    #[arg(long)]
    no_metrics: bool,
}

/// Effective configuration derived from args and config file.
struct DaemonConfig {
    listen_addr: SocketAddr,
    metrics_addr: SocketAddr,
    metrics_disabled: bool,
}

impl DaemonConfig {
    fn new(args: &Args) -> Result<Self> {
        let config = if args.config.exists() {
            ServerConfig::from_file(&args.config).context("failed to load configuration")?
        } else {
            ServerConfig::default()
        };

        // CLI args override config file values.
        let listen_addr = args.listen.unwrap_or(config.listen_addr);
        let metrics_port = args.metrics_port.unwrap_or(config.metrics_port);

        Ok(Self {
            listen_addr,
            metrics_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), metrics_port),
            metrics_disabled: args.no_metrics,
        })
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("failed to open log file")?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config = DaemonConfig::new(&args)?;
    let metrics = new_shared_registry().context("failed to build metrics registry")?;

    // The registry is built here and injected; nothing else owns one.
    let state = Arc::new(AppState::new(RocketRegistry::new(), Arc::clone(&metrics)));
    let app = routes::router(state);

    if config.metrics_disabled {
        info!("metrics endpoint disabled (--no-metrics)");
    } else {
        let metrics_addr = config.metrics_addr;
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(metrics, metrics_addr).await {
                error!("metrics server error: {e:#}");
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("failed to bind API listener")?;
    info!(addr = %config.listen_addr, "rockettrack API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Resolves when SIGTERM or SIGINT arrives.
async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

/// Serves the Prometheus text endpoint.
///
/// Binds to localhost only; if network access is required, front it with
/// a reverse proxy that handles authentication.
async fn run_metrics_server(metrics: SharedMetricsRegistry, addr: SocketAddr) -> Result<()> {
    let metrics_handler = move || {
        let metrics = Arc::clone(&metrics);
        async move {
            match metrics.encode_text() {
                Ok(body) => (
                    StatusCode::OK,
                    [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                    body,
                )
                    .into_response(),
                Err(e) => {
                    error!("failed to encode metrics: {e}");
                    (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response()
                },
            }
        }
    };

    let app = Router::new().route("/metrics", get(metrics_handler));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind metrics server")?;
    info!(addr = %addr, "metrics server listening");

    axum::serve(listener, app)
        .await
        .context("metrics server error")?;

    Ok(())
}
