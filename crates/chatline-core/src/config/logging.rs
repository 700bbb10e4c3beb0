//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Logging/tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter (overridden by `RUST_LOG`).
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format: "pretty" or "json".
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info,chatline=debug".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}
