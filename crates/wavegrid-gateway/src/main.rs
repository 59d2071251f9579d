//! Wavegrid classifier gateway binary.
//!
//! Loads `wavegrid-config.yaml` (or the file named by `WAVEGRID_CONFIG`),
//! points an HTTP classifier client at the configured service and serves
//! the duplex channel on the configured port.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wavegrid_core::config::{LoggingConfig, WavegridConfig};
use wavegrid_gateway::{AppState, Classifier, HttpClassifier, ServerConfig, start_server};

const DEFAULT_CONFIG: &str = "wavegrid-config.yaml";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let path = std::env::var_os("WAVEGRID_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = match WavegridConfig::load_or_default(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("wavegrid-gateway: {}: {e}", path.display());
            return std::process::ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);
    info!(config = %path.display(), "wavegrid-gateway starting");

    let classifier = match HttpClassifier::new(
        config.endpoints.ml_service_url.clone(),
        Duration::from_millis(config.endpoints.ml_timeout_ms),
    ) {
        Ok(http) => Classifier::Http(http),
        Err(e) => {
            error!("classifier client setup failed: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };
    info!(ml_service = %config.endpoints.ml_service_url, "classifier configured");

    let server = ServerConfig {
        port: config.endpoints.gateway_port,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(classifier));

    tokio::select! {
        result = start_server(&server, state) => {
            if let Err(e) = result {
                error!("{e}");
                return std::process::ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    std::process::ExitCode::SUCCESS
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
