//! Alerter
//!
//! Single consumer of anomalous records. Alerts are log events for now.

use std::sync::Arc;

use crossfire::AsyncRx;
use downlink_protocol::TelemetryRecord;
use tokio::task::JoinHandle;

use crate::metrics::PipelineMetrics;

/// Log-based alert emitter
#[derive(Debug, Default, Clone, Copy)]
pub struct Alerter;

impl Alerter {
    /// Spawn the alerter, which runs until every validate worker has dropped
    /// its alert sender
    pub fn spawn(input: AsyncRx<TelemetryRecord>, metrics: Arc<PipelineMetrics>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("alerter starting");

            while let Ok(record) = input.recv().await {
                Self::emit(&record);
                metrics.record_alert();
            }

            tracing::debug!(
                alerts = metrics.snapshot().alerts_emitted,
                "alerter stopping"
            );
        })
    }

    /// Emit one alert event for a tagged record
    pub fn emit(record: &TelemetryRecord) {
        let anomalies = record.anomaly_flags.descriptions();
        tracing::warn!(
            timestamp = record.secondary.timestamp,
            subsystem_id = record.secondary.subsystem_id,
            sequence_count = record.primary.sequence_count(),
            anomaly_flags = record.anomaly_flags.bits(),
            anomalies = ?anomalies,
            temperature = record.payload.temperature,
            battery = record.payload.battery,
            altitude = record.payload.altitude,
            signal = record.payload.signal,
            "telemetry anomaly detected"
        );
    }
}
