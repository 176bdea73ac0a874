//! Shared helpers for pipeline tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use downlink_protocol::{PrimaryHeader, SecondaryHeader, TelemetryPayload, TelemetryRecord};
use downlink_sinks::{StoreError, TelemetryStore};
use parking_lot::Mutex;

/// Store that records every committed batch, with failure injection
#[derive(Debug, Default)]
pub struct RecordingStore {
    batches: Mutex<Vec<Vec<TelemetryRecord>>>,
    attempts: AtomicUsize,
    /// Fail this many upcoming inserts
    fail_next: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(count: usize) -> Arc<Self> {
        let store = Self::default();
        store.fail_next.store(count, Ordering::SeqCst);
        Arc::new(store)
    }

    /// Sizes of committed batches, in commit order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.batches.lock().iter().flatten().copied().collect()
    }

    pub fn record_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }

    /// Insert calls, committed or failed
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryStore for RecordingStore {
    async fn insert_batch(&self, records: &[TelemetryRecord]) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        self.batches.lock().push(records.to_vec());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

/// A nominal record with a given sequence count
pub fn record(sequence_count: u16) -> TelemetryRecord {
    record_with(
        sequence_count,
        TelemetryPayload {
            temperature: 21.5,
            battery: 80.0,
            altitude: 520.0,
            signal: -60.0,
        },
    )
}

pub fn record_with(sequence_count: u16, payload: TelemetryPayload) -> TelemetryRecord {
    TelemetryRecord::new(
        PrimaryHeader::new(0, 0, true, 0x01, 0b11, sequence_count),
        SecondaryHeader {
            timestamp: 1_700_000_000 + u64::from(sequence_count),
            subsystem_id: 1,
        },
        payload,
    )
}

/// Poll `cond` until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
