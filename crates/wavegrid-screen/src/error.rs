//! Error types for the screen binary.

use std::path::PathBuf;

/// Top-level error for the screen binary.
///
/// Each variant wraps a subsystem error so the command loop can report
/// it and carry on.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: wavegrid_core::config::ConfigError,
    },

    /// The duplex channel could not be opened.
    #[error("transport error: {source}")]
    Transport {
        /// The underlying transport error.
        #[from]
        source: wavegrid_core::transport::TransportError,
    },

    /// A saved drawing could not be written.
    #[error("cannot write {path}: {source}")]
    Save {
        /// Target file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A drawing snapshot could not be serialized.
    #[error("snapshot serialization failed: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A screen task ended abnormally.
    #[error("screen task failed: {message}")]
    Task {
        /// Description of the failure.
        message: String,
    },
}
