//! Decode pool
//!
//! A fixed set of workers pulling raw datagrams off the shared ingress queue.
//! Each datagram becomes one record for the validate pool or one error for
//! the monitor, never both.

use std::sync::Arc;

use bytes::Bytes;
use crossfire::{MAsyncRx, MAsyncTx};
use downlink_protocol::{TelemetryRecord, decode};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;

/// Default number of decode workers
pub const DEFAULT_DECODE_WORKERS: usize = 10;

/// Worker pool turning datagrams into records
#[derive(Debug, Clone, Copy)]
pub struct DecodePool {
    workers: usize,
}

impl Default for DecodePool {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_WORKERS)
    }
}

impl DecodePool {
    /// Create a pool of `workers` tasks (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers
    ///
    /// Workers stop on cancellation once the datagram in hand has been
    /// forwarded. Datagrams still queued at that point are abandoned. A worker
    /// also stops when the ingress queue closes or the validate pool is gone.
    /// The validate hand-off blocks; the decode pool absorbs that pressure and
    /// the listener sheds it.
    pub fn spawn(
        self,
        ingress: MAsyncRx<Bytes>,
        validate: MAsyncTx<TelemetryRecord>,
        errors: MAsyncTx<PipelineError>,
        metrics: Arc<PipelineMetrics>,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        tracing::info!(workers = self.workers, "decode pool starting");

        (0..self.workers)
            .map(|worker_id| {
                let ingress = ingress.clone();
                let validate = validate.clone();
                let errors = errors.clone();
                let metrics = Arc::clone(&metrics);
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    tracing::debug!(worker_id, "decode worker starting");
                    run_worker(&ingress, &validate, &errors, &metrics, &cancel).await;
                    tracing::debug!(worker_id, "decode worker stopping");
                })
            })
            .collect()
    }
}

async fn run_worker(
    ingress: &MAsyncRx<Bytes>,
    validate: &MAsyncTx<TelemetryRecord>,
    errors: &MAsyncTx<PipelineError>,
    metrics: &PipelineMetrics,
    cancel: &CancellationToken,
) {
    loop {
        let datagram = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = ingress.recv() => match received {
                Ok(datagram) => datagram,
                Err(_) => break,
            },
        };

        match decode(&datagram) {
            Ok(record) => {
                metrics.record_decoded();
                if validate.send(record).await.is_err() {
                    tracing::debug!("validate queue closed, decode worker exiting");
                    break;
                }
            }
            Err(e) => {
                metrics.record_decode_error();
                tracing::trace!(error = %e, len = datagram.len(), "discarding undecodable datagram");
                if errors.send(PipelineError::from(e)).await.is_err() {
                    tracing::debug!("error queue closed, decode error not reported");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
