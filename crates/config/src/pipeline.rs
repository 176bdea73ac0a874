//! Pipeline stage and queue sizing
//!
//! Worker counts per pool, inter-stage queue capacities and the shutdown join
//! bound. Every field has the reference deployment value as its default.

use serde::Deserialize;
use std::time::Duration;

/// Pipeline configuration
///
/// # Example
///
/// ```toml
/// [pipeline]
/// decode_workers = 10
/// validate_workers = 5
/// persist_queue_size = 2000
/// shutdown_timeout = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Decode pool size
    /// Default: 10
    pub decode_workers: usize,

    /// Validate pool size
    /// Default: 5
    pub validate_workers: usize,

    /// Listener -> decode queue capacity; the listener drops when it is full
    /// Default: 1
    pub ingress_queue_size: usize,

    /// Decode -> validate queue capacity
    /// Default: 16
    pub validate_queue_size: usize,

    /// Validate -> alerter queue capacity
    /// Default: 64
    pub alert_queue_size: usize,

    /// Validate -> batch writer queue capacity
    /// Default: 2000
    pub persist_queue_size: usize,

    /// Shared error queue capacity
    /// Default: 64
    pub error_queue_size: usize,

    /// Upper bound on joining each stage at shutdown
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decode_workers: 10,
            validate_workers: 5,
            ingress_queue_size: 1,
            validate_queue_size: 16,
            alert_queue_size: 64,
            persist_queue_size: 2000,
            error_queue_size: 64,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
