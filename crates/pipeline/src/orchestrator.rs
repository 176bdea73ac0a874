//! Orchestrator
//!
//! Builds the stage queues, spawns every stage, and shuts them down in
//! dependency order once the cancellation token fires.
//!
//! Stages are spawned consumers first so that no producer ever sends into a
//! queue without a reader. Shutdown follows the queues downstream: each stage
//! exits when its upstream senders are gone, and the orchestrator joins them
//! in the same order.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use downlink_protocol::TelemetryRecord;
use downlink_sinks::TelemetryStore;
use downlink_sources::{ListenerMetricsSnapshot, UdpListener};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::alert::Alerter;
use crate::anomaly::AnomalyThresholds;
use crate::decode::{DEFAULT_DECODE_WORKERS, DecodePool};
use crate::error::PipelineError;
use crate::metrics::{PipelineMetrics, PipelineMetricsSnapshot};
use crate::monitor::ErrorMonitor;
use crate::validate::{DEFAULT_VALIDATE_WORKERS, ValidatePool};
use crate::writer::{BatchWriter, BatchWriterConfig};

/// Listener to decode pool
///
/// One slot: a datagram that finds every decode worker busy is dropped.
pub const DEFAULT_INGRESS_QUEUE_SIZE: usize = 1;

/// Decode pool to validate pool
pub const DEFAULT_VALIDATE_QUEUE_SIZE: usize = 16;

/// Validate pool to alerter
pub const DEFAULT_ALERT_QUEUE_SIZE: usize = 64;

/// Validate pool to batch writer
pub const DEFAULT_PERSIST_QUEUE_SIZE: usize = 2000;

/// All stages to error monitor
pub const DEFAULT_ERROR_QUEUE_SIZE: usize = 64;

/// Upper bound on each stage join during shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Stage sizing and policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub decode_workers: usize,
    pub validate_workers: usize,
    pub ingress_queue_size: usize,
    pub validate_queue_size: usize,
    pub alert_queue_size: usize,
    pub persist_queue_size: usize,
    pub error_queue_size: usize,
    pub shutdown_timeout: Duration,
    pub writer: BatchWriterConfig,
    pub thresholds: AnomalyThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decode_workers: DEFAULT_DECODE_WORKERS,
            validate_workers: DEFAULT_VALIDATE_WORKERS,
            ingress_queue_size: DEFAULT_INGRESS_QUEUE_SIZE,
            validate_queue_size: DEFAULT_VALIDATE_QUEUE_SIZE,
            alert_queue_size: DEFAULT_ALERT_QUEUE_SIZE,
            persist_queue_size: DEFAULT_PERSIST_QUEUE_SIZE,
            error_queue_size: DEFAULT_ERROR_QUEUE_SIZE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            writer: BatchWriterConfig::default(),
            thresholds: AnomalyThresholds::default(),
        }
    }
}

/// Final counters returned by [`Pipeline::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub listener: ListenerMetricsSnapshot,
    pub stages: PipelineMetricsSnapshot,
    /// Every stage stopped within its shutdown timeout
    pub clean_shutdown: bool,
}

impl PipelineSummary {
    /// Datagrams shed at ingress
    pub fn packets_dropped(&self) -> u64 {
        self.listener.packets_dropped
    }

    /// Admitted datagrams still queued for decode when the workers stopped
    pub fn datagrams_abandoned(&self) -> u64 {
        self.listener
            .packets_admitted
            .saturating_sub(self.stages.records_decoded + self.stages.decode_errors)
    }

    fn log(&self) {
        tracing::info!(
            packets_received = self.listener.packets_received,
            packets_admitted = self.listener.packets_admitted,
            packets_dropped = self.listener.packets_dropped,
            datagrams_abandoned = self.datagrams_abandoned(),
            records_decoded = self.stages.records_decoded,
            decode_errors = self.stages.decode_errors,
            anomalies = self.stages.anomalies_detected,
            records_written = self.stages.records_written,
            batches_written = self.stages.batches_written,
            records_discarded = self.stages.records_discarded,
            errors_observed = self.stages.errors_observed,
            clean_shutdown = self.clean_shutdown,
            "pipeline stopped"
        );
    }
}

/// The wired telemetry pipeline
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn TelemetryStore>,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn TelemetryStore>) -> Self {
        Self {
            config,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Shared stage counters; the handle outlives `run`
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every stage until `cancel` fires, then shut down and join
    ///
    /// If the listener stops on its own the token is cancelled so the rest of
    /// the pipeline follows it down.
    pub async fn run(self, listener: UdpListener, cancel: CancellationToken) -> PipelineSummary {
        let Self {
            config,
            store,
            metrics,
        } = self;
        let listener_metrics = listener.metrics();

        let (ingress_tx, ingress_rx) =
            crossfire::mpmc::bounded_async::<Bytes>(config.ingress_queue_size.max(1));
        let (validate_tx, validate_rx) =
            crossfire::mpmc::bounded_async::<TelemetryRecord>(config.validate_queue_size.max(1));
        let (alert_tx, alert_rx) =
            crossfire::mpsc::bounded_async::<TelemetryRecord>(config.alert_queue_size.max(1));
        let (persist_tx, persist_rx) =
            crossfire::mpsc::bounded_async::<TelemetryRecord>(config.persist_queue_size.max(1));
        let (error_tx, error_rx) =
            crossfire::mpsc::bounded_async::<PipelineError>(config.error_queue_size.max(1));

        let monitor = ErrorMonitor::spawn(error_rx, Arc::clone(&metrics));

        let writer = BatchWriter::new(config.writer, store, error_tx.clone(), Arc::clone(&metrics));
        let writer = tokio::spawn(writer.run(persist_rx, cancel.clone()));

        let alerter = Alerter::spawn(alert_rx, Arc::clone(&metrics));

        let validators = ValidatePool::new(config.validate_workers, config.thresholds).spawn(
            validate_rx,
            alert_tx,
            persist_tx,
            Arc::clone(&metrics),
        );

        let decoders = DecodePool::new(config.decode_workers).spawn(
            ingress_rx,
            validate_tx,
            error_tx,
            Arc::clone(&metrics),
            cancel.clone(),
        );

        tracing::info!(
            address = %listener.local_addr(),
            decode_workers = config.decode_workers,
            validate_workers = config.validate_workers,
            batch_size = config.writer.batch_size,
            "pipeline started"
        );

        let mut listener_task = tokio::spawn(listener.run(ingress_tx, cancel.clone()));
        let mut clean = true;

        let listener_stopped_early = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = &mut listener_task => Some(result),
        };

        let listener_snapshot = match listener_stopped_early {
            Some(result) => {
                tracing::warn!("listener stopped before cancellation, shutting down pipeline");
                cancel.cancel();
                result.ok()
            }
            None => {
                tracing::info!("shutdown requested, stopping pipeline");
                join_stage("listener", listener_task, config.shutdown_timeout).await
            }
        };
        clean &= listener_snapshot.is_some();

        clean &= join_pool("decode", decoders, config.shutdown_timeout).await;
        clean &= join_pool("validate", validators, config.shutdown_timeout).await;
        clean &= join_stage("alerter", alerter, config.shutdown_timeout).await.is_some();
        clean &= join_stage("writer", writer, config.shutdown_timeout).await.is_some();
        clean &= join_stage("monitor", monitor, config.shutdown_timeout).await.is_some();

        let summary = PipelineSummary {
            listener: listener_snapshot.unwrap_or_else(|| listener_metrics.snapshot()),
            stages: metrics.snapshot(),
            clean_shutdown: clean,
        };
        summary.log();
        summary
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("store", &self.store.kind())
            .finish()
    }
}

/// Join one task, aborting it if it outlives `timeout`
async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>, timeout: Duration) -> Option<T> {
    join_until(stage, handle, Instant::now() + timeout).await
}

/// Join every worker of a pool against one shared deadline
async fn join_pool(stage: &'static str, handles: Vec<JoinHandle<()>>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut clean = true;
    for handle in handles {
        clean &= join_until(stage, handle, deadline).await.is_some();
    }
    if clean {
        tracing::debug!(stage, "stage stopped");
    }
    clean
}

async fn join_until<T>(stage: &'static str, handle: JoinHandle<T>, deadline: Instant) -> Option<T> {
    let abort = handle.abort_handle();
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::error!(stage, error = %e, "stage task failed");
            None
        }
        Err(_) => {
            tracing::warn!(stage, "stage did not stop before the shutdown timeout, aborting");
            abort.abort();
            None
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;
