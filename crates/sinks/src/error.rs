//! Store errors

/// Errors from telemetry stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver error (query, transaction, pool)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record timestamp cannot be represented as a database timestamp
    #[error("record {index} has unrepresentable timestamp {timestamp}")]
    TimestampOutOfRange { index: usize, timestamp: u64 },

    /// Batch would exceed the bind parameter limit of one statement
    #[error("batch of {records} records exceeds the {max} rows one insert can carry")]
    BatchTooLarge { records: usize, max: usize },

    /// Startup connection attempts exhausted
    #[error("failed to connect to store after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// Shutdown requested while still connecting
    #[error("store connect cancelled after {attempts} attempts")]
    ConnectCancelled { attempts: u32 },
}

impl StoreError {
    #[inline]
    pub fn timestamp_out_of_range(index: usize, timestamp: u64) -> Self {
        Self::TimestampOutOfRange { index, timestamp }
    }

    #[inline]
    pub fn batch_too_large(records: usize, max: usize) -> Self {
        Self::BatchTooLarge { records, max }
    }
}
