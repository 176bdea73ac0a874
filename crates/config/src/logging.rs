//! Logging configuration
//!
//! Controls how the downlink process writes its own diagnostics.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, one line per event (default)
    #[default]
    Console,
    /// One JSON object per line, for log shippers
    Json,
}

/// Log destination
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "json"
/// output = "stderr"
/// filter = "downlink_pipeline=debug,sqlx=warn"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base log level
    /// Default: info
    pub level: LogLevel,

    /// Output format (console, json)
    /// Default: console
    pub format: LogFormat,

    /// Output destination (stdout, stderr)
    /// Default: stdout
    pub output: LogOutput,

    /// Extra `EnvFilter` directives appended after the base level
    pub filter: Option<String>,
}

impl LogConfig {
    /// Full filter directive string for a given base level
    pub fn directives(&self, level: &str) -> String {
        match self.filter.as_deref() {
            Some(extra) if !extra.trim().is_empty() => format!("{level},{extra}"),
            _ => level.to_string(),
        }
    }
}
