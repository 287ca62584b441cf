//! Logging setup
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` takes precedence
//! over the configured level.

use crate::config::DebugConfig;
use crate::error::{Result, RuntimeError};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter for a configured level, honouring `RUST_LOG` when set
pub fn env_filter(config: &DebugConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()))
}

/// Initialize the global subscriber
///
/// Fails if a subscriber is already installed or the log file cannot be opened.
pub fn init(config: &DebugConfig) -> Result<()> {
    let filter = env_filter(config);

    let installed = if config.log_to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    installed.map_err(|e| RuntimeError::Config(format!("failed to install logger: {}", e)))
}
