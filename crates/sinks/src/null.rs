//! Null store - accepts and discards every batch
//!
//! Used for load tests of the ingestion path without a database.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use downlink_protocol::TelemetryRecord;

use crate::error::StoreError;
use crate::store::TelemetryStore;

/// Store that discards batches after counting them
#[derive(Debug, Default)]
pub struct NullStore {
    batches: AtomicU64,
    records: AtomicU64,
}

impl NullStore {
    pub const fn new() -> Self {
        Self {
            batches: AtomicU64::new(0),
            records: AtomicU64::new(0),
        }
    }

    /// Batches accepted so far
    #[inline]
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Records accepted so far
    #[inline]
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TelemetryStore for NullStore {
    async fn insert_batch(&self, records: &[TelemetryRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "null"
    }
}
