//! Batch writer
//!
//! Single consumer of the persist queue. Records accumulate in an owned
//! buffer that is handed to the store whenever one of three triggers fires:
//!
//! - **Size**: the buffer reaches `batch_size`
//! - **Interval**: the flush timer ticks with a non-empty buffer
//! - **Shutdown**: the persist queue closes with a non-empty buffer
//!
//! Each flush is one store transaction. A failed flush loses the whole batch;
//! the writer reports the failure and carries on with an empty buffer.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossfire::{AsyncRx, MAsyncTx};
use downlink_protocol::TelemetryRecord;
use downlink_sinks::TelemetryStore;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;

/// Default records per flush
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default flush period
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Batch writer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWriterConfig {
    /// Flush as soon as this many records are buffered
    pub batch_size: usize,

    /// Flush period; `None` disables the timer
    pub flush_interval: Option<Duration>,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL),
        }
    }
}

impl BatchWriterConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the flush period (zero disables the timer)
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn without_flush_interval(mut self) -> Self {
        self.flush_interval = None;
        self
    }
}

/// Why a flush happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Size,
    Interval,
    Shutdown,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Interval => "interval",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batching consumer of the persist queue
pub struct BatchWriter {
    config: BatchWriterConfig,
    store: Arc<dyn TelemetryStore>,
    errors: MAsyncTx<PipelineError>,
    metrics: Arc<PipelineMetrics>,
}

impl BatchWriter {
    /// Create a writer
    ///
    /// A zero `batch_size` is treated as one.
    pub fn new(
        config: BatchWriterConfig,
        store: Arc<dyn TelemetryStore>,
        errors: MAsyncTx<PipelineError>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let config = BatchWriterConfig {
            batch_size: config.batch_size.max(1),
            ..config
        };
        Self {
            config,
            store,
            errors,
            metrics,
        }
    }

    pub fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    /// Run until the persist queue closes
    ///
    /// Cancellation switches the writer into drain mode: size and interval
    /// flushes keep working while upstream stages empty their queues, and the
    /// remaining buffer is flushed once the last sender is gone. The final
    /// flush does not observe the token.
    pub async fn run(self, input: AsyncRx<TelemetryRecord>, cancel: CancellationToken) {
        tracing::info!(
            store = self.store.kind(),
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval.map(|d| d.as_millis() as u64),
            "batch writer starting"
        );

        let mut batch: Vec<TelemetryRecord> = Vec::with_capacity(self.config.batch_size);
        let mut ticker = self.config.flush_interval.map(flush_ticker);
        let mut draining = false;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !draining => {
                    draining = true;
                    tracing::debug!(buffered = batch.len(), "batch writer draining");
                }

                _ = next_tick(&mut ticker) => {
                    if !batch.is_empty() {
                        self.flush(&mut batch, FlushReason::Interval).await;
                    }
                }

                received = input.recv() => match received {
                    Ok(record) => {
                        batch.push(record);
                        if batch.len() >= self.config.batch_size {
                            self.flush(&mut batch, FlushReason::Size).await;
                        }
                    }
                    Err(_) => break,
                },
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, FlushReason::Shutdown).await;
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            batches_written = snapshot.batches_written,
            records_written = snapshot.records_written,
            records_discarded = snapshot.records_discarded,
            write_errors = snapshot.write_errors,
            avg_batch_size = snapshot.avg_batch_size(),
            avg_write_us = snapshot.avg_write_duration_us(),
            "batch writer shutting down"
        );
    }

    /// Hand the buffer to the store and leave an empty one in its place
    async fn flush(&self, batch: &mut Vec<TelemetryRecord>, reason: FlushReason) {
        let records = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let count = records.len();
        let started = Instant::now();

        match self.store.insert_batch(&records).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                self.metrics.record_batch_written(count, elapsed);
                tracing::debug!(
                    records = count,
                    reason = %reason,
                    elapsed_us = elapsed.as_micros() as u64,
                    "telemetry batch committed"
                );
            }
            Err(e) => {
                self.metrics.record_write_error(count);
                tracing::debug!(records = count, reason = %reason, "telemetry batch failed");
                if self.errors.send(PipelineError::write(count, e)).await.is_err() {
                    tracing::error!(records = count, "error queue closed, write failure not reported");
                }
            }
        }
    }
}

impl fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchWriter")
            .field("config", &self.config)
            .field("store", &self.store.kind())
            .finish()
    }
}

/// Timer whose first tick fires one full period after start
fn flush_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
