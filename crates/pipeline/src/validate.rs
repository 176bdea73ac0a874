//! Validate pool
//!
//! Tags every record with its anomaly bitmask, routes anomalous records to
//! the alerter, and forwards every record to the batch writer.

use std::sync::Arc;

use crossfire::{MAsyncRx, MAsyncTx};
use downlink_protocol::TelemetryRecord;
use tokio::task::JoinHandle;

use crate::anomaly::AnomalyThresholds;
use crate::metrics::PipelineMetrics;

/// Default number of validate workers
pub const DEFAULT_VALIDATE_WORKERS: usize = 5;

/// Worker pool applying the anomaly policy
#[derive(Debug, Clone, Copy)]
pub struct ValidatePool {
    workers: usize,
    thresholds: AnomalyThresholds,
}

impl Default for ValidatePool {
    fn default() -> Self {
        Self::new(DEFAULT_VALIDATE_WORKERS, AnomalyThresholds::default())
    }
}

impl ValidatePool {
    /// Create a pool of `workers` tasks (at least one)
    pub fn new(workers: usize, thresholds: AnomalyThresholds) -> Self {
        Self {
            workers: workers.max(1),
            thresholds,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers
    ///
    /// Workers do not watch the cancellation token. They drain their input
    /// until every decode worker has dropped its sender, so a record that left
    /// the decode pool always reaches the writer. Both outbound sends block.
    pub fn spawn(
        self,
        input: MAsyncRx<TelemetryRecord>,
        alerts: MAsyncTx<TelemetryRecord>,
        persist: MAsyncTx<TelemetryRecord>,
        metrics: Arc<PipelineMetrics>,
    ) -> Vec<JoinHandle<()>> {
        tracing::info!(workers = self.workers, "validate pool starting");

        let thresholds = self.thresholds;
        (0..self.workers)
            .map(|worker_id| {
                let input = input.clone();
                let alerts = alerts.clone();
                let persist = persist.clone();
                let metrics = Arc::clone(&metrics);

                tokio::spawn(async move {
                    tracing::debug!(worker_id, "validate worker starting");
                    run_worker(&thresholds, &input, &alerts, &persist, &metrics).await;
                    tracing::debug!(worker_id, "validate worker stopping");
                })
            })
            .collect()
    }
}

async fn run_worker(
    thresholds: &AnomalyThresholds,
    input: &MAsyncRx<TelemetryRecord>,
    alerts: &MAsyncTx<TelemetryRecord>,
    persist: &MAsyncTx<TelemetryRecord>,
    metrics: &PipelineMetrics,
) {
    while let Ok(mut record) = input.recv().await {
        record.anomaly_flags = thresholds.evaluate(&record.payload);
        let anomalous = record.is_anomalous();
        metrics.record_validated(anomalous);

        if anomalous && alerts.send(record).await.is_err() {
            tracing::debug!(
                sequence_count = record.primary.sequence_count(),
                "alert queue closed, alert not raised"
            );
        }

        if persist.send(record).await.is_err() {
            tracing::warn!(
                sequence_count = record.primary.sequence_count(),
                "persist queue closed, validate worker exiting"
            );
            break;
        }
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;
