//! Telemetry store trait
//!
//! The batch writer talks to storage only through this trait, so the
//! production PostgreSQL store and the null store are interchangeable.

use async_trait::async_trait;
use downlink_protocol::TelemetryRecord;

use crate::error::StoreError;

/// Transactional batch persistence
///
/// Implementations must be all-or-nothing per call: either every record of
/// the batch is persisted, or none is and an error is returned.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist one batch as a single transaction
    ///
    /// An empty batch is a no-op.
    async fn insert_batch(&self, records: &[TelemetryRecord]) -> Result<(), StoreError>;

    /// Short backend name for logs ("postgres", "null")
    fn kind(&self) -> &'static str;

    /// Release pooled resources
    ///
    /// Called once after every writer has stopped.
    async fn close(&self) {}
}
