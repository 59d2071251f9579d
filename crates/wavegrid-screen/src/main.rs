//! Wavegrid screen host binary.
//!
//! Runs one screen at a time against the classifier gateway. The mode
//! comes from `screen.mode` in `wavegrid-config.yaml` (or the file named
//! by `WAVEGRID_CONFIG`, or `WAVEGRID_MODE`) and can be switched at the
//! prompt.
//!
//! # Commands (stdin)
//!
//! | Command | Effect |
//! |---------|--------|
//! | `start` | Open a session if none is live, then start (or restart) the game |
//! | `stop` | Stop the active session and close its channel |
//! | `mode <detect\|snake\|face\|draw>` | Stop any active session and switch mode |
//! | `status` | Report the active session |
//! | `quit` | Stop and exit |

mod error;
mod host;
mod screen;
mod sink;

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wavegrid_core::config::{LoggingConfig, WavegridConfig};

use crate::error::ScreenError;
use crate::host::{Host, gateway_connector};

const DEFAULT_CONFIG: &str = "wavegrid-config.yaml";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("wavegrid-screen: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ScreenError> {
    let path = std::env::var_os("WAVEGRID_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = WavegridConfig::load_or_default(&path)?;
    init_tracing(&config.logging);
    info!(
        config = %path.display(),
        gateway = %config.endpoints.gateway_url,
        mode = ?config.screen.mode,
        "wavegrid-screen starting"
    );

    let mut host = Host::new(config, gateway_connector());
    if host.config().screen.autostart {
        host.start().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {e}");
                break;
            }
        };
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("start"), _) => host.start().await,
            (Some("stop"), _) => host.stop().await,
            (Some("mode"), Some(name)) => host.switch_mode(name).await,
            (Some("status"), _) => host.status(),
            (Some("quit" | "exit"), _) => break,
            (None, _) => {}
            (Some(other), _) => warn!(command = other, "unknown command"),
        }
    }

    host.stop().await;
    info!("wavegrid-screen exiting");
    Ok(())
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
