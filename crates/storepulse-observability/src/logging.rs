//! Global tracing subscriber setup

use serde::{Deserialize, Serialize};
use storepulse_core::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter directive, e.g. `info` or `storepulse_traversal=debug,info`
    pub level: String,
    /// Emit one JSON object per line instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Filter built from `RUST_LOG` when set, otherwise from `level`
    pub fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", self.level, e)))
    }
}

/// Install the global subscriber
///
/// Fails when the filter does not parse or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let installed = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))?;
    tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
