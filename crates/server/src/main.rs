//! Sheetbase server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use sheetbase_core::config::AppConfig;
use sheetbase_server::poll::spawn_reconcile_task;
use sheetbase_server::{AppState, StaticTokenVerifier, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sheetbase - REST service over spreadsheet-backed datasets
#[derive(Parser, Debug)]
#[command(name = "sheetbased")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SHEETBASE_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Sheetbase v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    // SHEETBASE_CONFIG is only the file path
    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("SHEETBASE_") && key != "SHEETBASE_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: sheetbased --config /path/to/config.toml\n  \
             2. Environment variables: SHEETBASE_SERVER__BIND=0.0.0.0:5000 \
             SHEETBASE_CATALOG__CONTAINER_ID=YOUR_FOLDER_ID sheetbased\n\n\
             See config/server.example.toml for example configuration.\n\
             Set SHEETBASE_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SHEETBASE_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    sheetbase_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let provider =
        sheetbase_provider::from_config(&config.provider).context("failed to initialize provider")?;
    tracing::info!(backend = provider.backend_name(), "Tabular provider initialized");

    let metadata = sheetbase_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    let identity = Arc::new(StaticTokenVerifier::from_config(&config.auth));

    let state = AppState::new(config.clone(), provider, metadata, identity);

    if let Some(interval) = state.reconcile_poll_interval() {
        spawn_reconcile_task(state.clone(), interval);
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Background reconciliation enabled"
        );
    } else {
        tracing::info!("Background reconciliation disabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
