//! Process setup shared by the API and worker binaries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidkeep_core::{load_config, validate_config, Config};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VIDKEEP_CONFIG";

/// Install the global tracing subscriber, reading `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load and validate the configuration named by [`CONFIG_ENV`].
pub fn load() -> Result<Config> {
    let config_path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Data path: {:?}", config.storage.data_path);
    Ok(config)
}

/// Open a Redis client and a managed multiplexed connection on it.
pub async fn connect_redis(url: &str) -> Result<(redis::Client, ConnectionManager)> {
    let client = redis::Client::open(url).context("Invalid Redis URL")?;
    let conn = ConnectionManager::new(client.clone())
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis");
    Ok((client, conn))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
