//! Pipeline stage metrics
//!
//! Atomic counters shared by every stage through one `Arc<PipelineMetrics>`.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for the decode, validate, alert, write and monitor stages
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Datagrams decoded into records
    records_decoded: AtomicU64,

    /// Datagrams discarded by the decoder
    decode_errors: AtomicU64,

    /// Records tagged by the validate pool
    records_validated: AtomicU64,

    /// Records with at least one anomaly flag
    anomalies_detected: AtomicU64,

    /// Alerts emitted by the alerter
    alerts_emitted: AtomicU64,

    /// Records committed to the store
    records_written: AtomicU64,

    /// Batches committed to the store
    batches_written: AtomicU64,

    /// Records lost with a failed batch
    records_discarded: AtomicU64,

    /// Failed batch transactions
    write_errors: AtomicU64,

    /// Total time spent in committed batch transactions, in nanoseconds
    write_duration_ns: AtomicU64,

    /// Errors drained by the error monitor
    errors_observed: AtomicU64,
}

impl PipelineMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            records_decoded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            records_validated: AtomicU64::new(0),
            anomalies_detected: AtomicU64::new(0),
            alerts_emitted: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            records_discarded: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            write_duration_ns: AtomicU64::new(0),
            errors_observed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tagged record, counting it as an anomaly if flagged
    #[inline]
    pub fn record_validated(&self, anomalous: bool) {
        self.records_validated.fetch_add(1, Ordering::Relaxed);
        if anomalous {
            self.anomalies_detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_alert(&self) {
        self.alerts_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed batch
    #[inline]
    pub fn record_batch_written(&self, records: usize, duration: Duration) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.records_written
            .fetch_add(records as u64, Ordering::Relaxed);
        self.write_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a failed batch and the records lost with it
    #[inline]
    pub fn record_write_error(&self, records: usize) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
        self.records_discarded
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error_observed(&self) {
        self.errors_observed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            records_validated: self.records_validated.load(Ordering::Relaxed),
            anomalies_detected: self.anomalies_detected.load(Ordering::Relaxed),
            alerts_emitted: self.alerts_emitted.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            records_discarded: self.records_discarded.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            write_duration_ns: self.write_duration_ns.load(Ordering::Relaxed),
            errors_observed: self.errors_observed.load(Ordering::Relaxed),
        }
    }

    /// Get records written count
    #[inline]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Get decode errors count
    #[inline]
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of pipeline metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub records_decoded: u64,
    pub decode_errors: u64,
    pub records_validated: u64,
    pub anomalies_detected: u64,
    pub alerts_emitted: u64,
    pub records_written: u64,
    pub batches_written: u64,
    pub records_discarded: u64,
    pub write_errors: u64,
    pub write_duration_ns: u64,
    pub errors_observed: u64,
}

impl PipelineMetricsSnapshot {
    /// Average committed batch size
    pub fn avg_batch_size(&self) -> f64 {
        if self.batches_written == 0 {
            0.0
        } else {
            self.records_written as f64 / self.batches_written as f64
        }
    }

    /// Average transaction time in microseconds
    pub fn avg_write_duration_us(&self) -> f64 {
        if self.batches_written == 0 {
            0.0
        } else {
            (self.write_duration_ns as f64 / self.batches_written as f64) / 1000.0
        }
    }

    /// Records that left the validate pool but never reached a terminal outcome
    pub fn records_unaccounted(&self) -> u64 {
        self.records_validated
            .saturating_sub(self.records_written + self.records_discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot, PipelineMetricsSnapshot::default());
    }

    #[test]
    fn test_validated_counts_anomalies() {
        let metrics = PipelineMetrics::new();
        metrics.record_validated(false);
        metrics.record_validated(true);
        metrics.record_validated(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_validated, 3);
        assert_eq!(snapshot.anomalies_detected, 2);
    }

    #[test]
    fn test_write_outcomes() {
        let metrics = PipelineMetrics::new();
        metrics.record_batch_written(500, Duration::from_micros(300));
        metrics.record_batch_written(100, Duration::from_micros(100));
        metrics.record_write_error(42);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_written, 2);
        assert_eq!(snapshot.records_written, 600);
        assert_eq!(snapshot.write_errors, 1);
        assert_eq!(snapshot.records_discarded, 42);
        assert!((snapshot.avg_batch_size() - 300.0).abs() < f64::EPSILON);
        assert!((snapshot.avg_write_duration_us() - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_averages_with_no_batches() {
        let snapshot = PipelineMetricsSnapshot::default();
        assert_eq!(snapshot.avg_batch_size(), 0.0);
        assert_eq!(snapshot.avg_write_duration_us(), 0.0);
    }

    #[test]
    fn test_records_unaccounted() {
        let snapshot = PipelineMetricsSnapshot {
            records_validated: 10,
            records_written: 6,
            records_discarded: 3,
            ..Default::default()
        };
        assert_eq!(snapshot.records_unaccounted(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(PipelineMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.record_decoded();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.snapshot().records_decoded, 4000);
    }
}
