//! Environment-driven settings for the wrapper itself
//!
//! Nothing here affects the child: the wrapper forwards its environment
//! unmodified, these variables included.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Environment variable names read by the wrapper
pub const LOG_FILTER_VAR: &str = "PROCESS_WRAPPER_LOG"; // tracing EnvFilter directive
pub const LOG_FORMAT_VAR: &str = "PROCESS_WRAPPER_LOG_FORMAT"; // "text" or "json"

/// Quiet unless asked; diagnostics the caller relies on go through eprintln.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Output format for the wrapper's own log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// Parse a format string (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("invalid log format: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperSettings {
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for WrapperSettings {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl WrapperSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup. Blank or unknown
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_filter = lookup(LOG_FILTER_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let log_format = lookup(LOG_FORMAT_VAR)
            .and_then(|value| LogFormat::parse(&value))
            .unwrap_or_default();

        Self {
            log_filter,
            log_format,
        }
    }
}
