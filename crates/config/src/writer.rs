//! Batch writer configuration

use serde::Deserialize;
use std::time::Duration;

/// Batch writer configuration
///
/// # Example
///
/// ```toml
/// [writer]
/// batch_size = 500
/// flush_interval = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Records per batch before a size-triggered flush
    /// Default: 500
    pub batch_size: usize,

    /// Periodic flush interval; "0s" disables the timer
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval: Duration::from_secs(5),
        }
    }
}

impl WriterConfig {
    /// Flush interval, `None` when the timer is disabled
    pub fn effective_flush_interval(&self) -> Option<Duration> {
        (!self.flush_interval.is_zero()).then_some(self.flush_interval)
    }
}
