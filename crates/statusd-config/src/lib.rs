//! Shared configuration for the status daemon.
//!
//! [`Config`] is resolved by `ortho_config` from four layers, lowest
//! precedence first: built-in defaults, a TOML file (`.statusd.toml`, or the
//! path given by `--config-path` / `STATUSD_CONFIG_PATH`), `STATUSD_*`
//! environment variables, and command-line flags.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_POPULAR_LIMIT, default_log_filter, default_log_filter_string,
    default_log_format, default_popular_limit,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "STATUSD")]
pub struct Config {
    /// Filter expression handed to the tracing subscriber.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the log stream.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Number of entries returned by statistics requests that omit a limit.
    #[serde(default = "default_popular_limit")]
    pub popular_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            popular_limit: default_popular_limit(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Limit used by statistics requests that do not carry their own.
    #[must_use]
    pub const fn popular_limit(&self) -> usize {
        self.popular_limit
    }
}
