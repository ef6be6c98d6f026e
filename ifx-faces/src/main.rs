//! ifx-faces - face comparison batch service
//!
//! Serves the browser front-end over HTTP + SSE and forwards comparisons to
//! the face recognition backend (`/compare-faces`).

use anyhow::{Context, Result};
use clap::Parser;
use ifx_faces::config::{CliOverrides, FacesConfig};
use ifx_faces::AppState;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ifx-faces")]
#[command(about = "Face comparison batch service")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config_dir>/ifx/ifx-faces.toml)
    #[arg(short, long, env = "IFX_FACES_CONFIG")]
    config: Option<PathBuf>,

    /// Comparison backend base URL
    #[arg(long, env = "IFX_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Bearer token for the comparison backend
    #[arg(long, env = "IFX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Address to listen on
    #[arg(short, long, env = "IFX_BIND_ADDR")]
    bind: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = FacesConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(CliOverrides {
        api_base_url: args.api_base_url,
        access_token: args.access_token,
        bind_addr: args.bind,
        log_level: args.log_level,
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.logging.filter_directive()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("Invalid configuration")?;

    info!("Starting ifx-faces (face comparison) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Comparison backend: {}", config.api_base_url);

    let state = AppState::from_config(&config).context("Failed to create comparison client")?;
    let app = ifx_faces::build_router(state.clone());

    let addr = config.bind_socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Abandon any batch still in flight
    state.workspace.write().await.reset();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
