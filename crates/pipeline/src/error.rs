//! Pipeline error types
//!
//! Errors reported to the error monitor by running stages. None of them
//! stops a stage.

use thiserror::Error;

use downlink_protocol::DecodeError;
use downlink_sinks::StoreError;

/// In-pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Packet could not be decoded and was discarded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Batch transaction failed and the whole batch was discarded
    #[error("batch write failed, {records} records discarded: {source}")]
    Write {
        records: usize,
        #[source]
        source: StoreError,
    },
}

impl PipelineError {
    /// Create a Write error
    pub fn write(records: usize, source: StoreError) -> Self {
        Self::Write { records, source }
    }

    /// Stage label for logs
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Write { .. } => "writer",
        }
    }
}
