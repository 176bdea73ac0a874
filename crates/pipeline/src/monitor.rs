//! Error monitor
//!
//! Drains the shared error queue and turns each error into a log event.
//! Errors are never escalated; no stage stops because of one.

use std::sync::Arc;

use crossfire::AsyncRx;
use tokio::task::JoinHandle;

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;

/// Consumer of in-pipeline errors
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorMonitor;

impl ErrorMonitor {
    /// Spawn the monitor, which runs until every producer has dropped its
    /// error sender
    pub fn spawn(input: AsyncRx<PipelineError>, metrics: Arc<PipelineMetrics>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("error monitor starting");

            while let Ok(err) = input.recv().await {
                metrics.record_error_observed();
                Self::report(&err);
            }

            tracing::debug!(
                errors = metrics.snapshot().errors_observed,
                "error monitor stopping"
            );
        })
    }

    /// Log one pipeline error
    pub fn report(err: &PipelineError) {
        match err {
            PipelineError::Decode(e) => {
                tracing::warn!(stage = err.stage(), error = %e, "packet discarded");
            }
            PipelineError::Write { records, source } => {
                tracing::error!(
                    stage = err.stage(),
                    records,
                    error = %source,
                    "telemetry batch discarded"
                );
            }
        }
    }
}
