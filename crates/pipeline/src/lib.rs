//! Downlink - Pipeline
//!
//! The staged worker pipeline between the UDP listener and the telemetry
//! store.
//!
//! # Architecture
//!
//! ```text
//!                                                  ┌──→ [Alerter]
//! [Listener] ──Bytes──→ [Decode ×10] ──Record──→ [Validate ×5]
//!   try_send              blocking                 └──→ [Batch Writer] ──→ Store
//!   (drop)                    │                              │
//!                             └────── PipelineError ─────────┴──→ [Error Monitor]
//! ```
//!
//! # Key Design
//!
//! - **Drop at the edge**: only the listener sheds load; every later hand-off
//!   blocks
//! - **Single lifecycle signal**: one `CancellationToken` reaches every stage
//! - **Drain on shutdown**: stages past the decode pool exit only when their
//!   input queue closes, so every decoded record reaches the writer
//! - **Lossy writes**: a failed batch is discarded and reported, never retried
//!
//! # Example
//!
//! ```ignore
//! use downlink_pipeline::{Pipeline, PipelineConfig};
//!
//! let listener = UdpListener::bind(UdpListenerConfig::default())?;
//! let pipeline = Pipeline::new(PipelineConfig::default(), store);
//! let summary = pipeline.run(listener, cancel.clone()).await;
//! ```

mod alert;
mod anomaly;
mod decode;
mod error;
mod metrics;
mod monitor;
mod orchestrator;
mod validate;
mod writer;

pub use alert::Alerter;
pub use anomaly::AnomalyThresholds;
pub use decode::{DEFAULT_DECODE_WORKERS, DecodePool};
pub use error::PipelineError;
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use monitor::ErrorMonitor;
pub use orchestrator::{
    DEFAULT_ALERT_QUEUE_SIZE, DEFAULT_ERROR_QUEUE_SIZE, DEFAULT_INGRESS_QUEUE_SIZE,
    DEFAULT_PERSIST_QUEUE_SIZE, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_VALIDATE_QUEUE_SIZE, Pipeline,
    PipelineConfig, PipelineSummary,
};
pub use validate::{DEFAULT_VALIDATE_WORKERS, ValidatePool};
pub use writer::{
    BatchWriter, BatchWriterConfig, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, FlushReason,
};

#[cfg(test)]
mod test_util;
