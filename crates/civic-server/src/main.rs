//! Server binary for the civic events API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`CIVIC_CONFIG`, then `civic-config.yaml`, then
//!    environment only)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the event store, scraper config store, and scrape cache
//! 4. Serve HTTP until `Ctrl-C`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use civic_api::AppState;
use civic_core::AppConfig;
use civic_core::config::{LogFormat, LoggingConfig};
use civic_db::Backends;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "civic-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration. Logging is not up yet, so the source is
    //    reported once it is.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        source = %source,
        backend = ?config.database.backend,
        shaping = ?config.database.shaping,
        cache = ?config.cache.backend,
        "civic-server starting"
    );

    // 3. Connect backends.
    let backends = Backends::connect(&config)
        .await
        .context("failed to connect storage backends")?;
    info!("Storage backends ready");

    // 4. Serve.
    let state = Arc::new(AppState::new(backends, &config));
    civic_api::start_server(&config.server, state)
        .await
        .context("API server failed")?;

    info!("civic-server exiting");
    Ok(())
}

/// Resolve and load configuration.
///
/// An explicit `CIVIC_CONFIG` path must exist. Otherwise the default file
/// is used when present, and the built-in defaults plus environment
/// overrides when it is not.
fn load_config() -> anyhow::Result<(AppConfig, String)> {
    if let Ok(path) = std::env::var("CIVIC_CONFIG") {
        let path = PathBuf::from(path);
        let config = AppConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok((config, path.display().to_string()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        let config = AppConfig::from_file(default_path)
            .with_context(|| format!("failed to load {DEFAULT_CONFIG_PATH}"))?;
        return Ok((config, DEFAULT_CONFIG_PATH.to_owned()));
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    Ok((config, "environment".to_owned()))
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
