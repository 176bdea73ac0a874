//! Downlink Configuration
//!
//! TOML-based configuration loading with the reference deployment values as
//! defaults. Minimal config should just work - only specify what you need to
//! change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use downlink_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[store]\nkind = \"null\"").unwrap();
//! assert_eq!(config.listener.port, 8089);
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [store]
//! url = "postgres://telemetry@localhost/telemetry"
//! ```
//!
//! # Example Full Config
//!
//! See `configs/config.toml` for all available options.

mod anomaly;
mod error;
mod listener;
mod logging;
mod pipeline;
mod store;
mod validation;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use anomaly::AnomalyConfig;
pub use error::{ConfigError, Result};
pub use listener::ListenerConfig;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use pipeline::PipelineConfig;
pub use store::{DEFAULT_URL_ENV, StoreConfig, StoreKind};
pub use validation::MAX_BATCH_SIZE;
pub use writer::WriterConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// UDP listener socket
    pub listener: ListenerConfig,

    /// Worker pools and queue sizing
    pub pipeline: PipelineConfig,

    /// Batch flush triggers
    pub writer: WriterConfig,

    /// Telemetry store connection
    pub store: StoreConfig,

    /// Anomaly thresholds
    pub anomaly: AnomalyConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load from `path` if it exists, otherwise validated defaults
    ///
    /// Returns the config and whether the file was found.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            return Ok((Self::from_file(path)?, true));
        }

        let config = Self::default();
        config.validate()?;
        Ok((config, false))
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
