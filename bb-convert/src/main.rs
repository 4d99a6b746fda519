//! BeatBridge conversion service (bb-convert) - Main entry point
//!
//! Serves the playlist conversion API: submit a conversion, poll its status,
//! or follow progress over SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bb_common::config::{load_toml_config, resolve_config_path, write_toml_config, TomlConfig};
use bb_common::events::EventBus;
use bb_convert::catalog::LiveCatalogProvider;
use bb_convert::config::{CliOverrides, ServiceConfig};
use bb_convert::models::Platform;
use bb_convert::services::{ConversionService, JobManager};
use bb_convert::{build_router, AppState};

const EVENT_BUS_CAPACITY: usize = 1000;

/// Command-line arguments for bb-convert
#[derive(Parser, Debug)]
#[command(name = "bb-convert")]
#[command(about = "Playlist conversion service for BeatBridge")]
#[command(version)]
struct Args {
    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Write a default config file to the config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());

    if args.init_config {
        let path = config_path.context("No config directory available on this platform")?;
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        write_toml_config(&TomlConfig::default(), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let toml_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    // Initialize tracing (RUST_LOG wins over the config file level)
    let default_filter = format!(
        "bb_convert={level},bb_common={level},tower_http=debug",
        level = toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BeatBridge conversion service v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config directory available, using defaults"),
    }

    let cli = CliOverrides {
        bind_address: args.bind,
        port: args.port,
    };
    let config = ServiceConfig::resolve(&cli, &toml_config).context("Invalid configuration")?;

    for platform in Platform::ALL {
        if config.credentials.is_configured(platform) {
            info!("{} catalog configured", platform.display_name());
        } else {
            warn!(
                "{} credentials not configured; conversions involving it need a user token",
                platform.display_name()
            );
        }
    }

    // Services
    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let jobs = JobManager::new(event_bus.clone());
    let catalogs = Arc::new(LiveCatalogProvider::new(
        config.credentials.clone(),
        config.http.clone(),
    ));
    let conversions = ConversionService::new(jobs.clone(), catalogs, config.orchestrator.clone());

    let eviction = jobs.spawn_eviction_task(config.job_retention, config.eviction_interval);
    info!(
        "Finished jobs retained for {}s (sweep every {}s)",
        config.job_retention.as_secs(),
        config.eviction_interval.as_secs()
    );

    let state = AppState::new(jobs, conversions, event_bus)
        .with_cors_origins(config.cors_origins.clone());
    let app = build_router(state);

    let addr = config.socket_addr().context("Invalid listen address")?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    eviction.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
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
