//! Decode error types

use thiserror::Error;

/// Errors produced while decoding a wire packet
///
/// Both variants are non-fatal: the packet is discarded and the error is
/// reported, nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer too short to hold a full packet
    #[error("header parse error: expected at least {expected} bytes, got {actual}")]
    HeaderParse { expected: usize, actual: usize },

    /// `Length` field does not match the fixed payload shape
    #[error("unexpected packet length: got {actual}, expected {expected}")]
    LengthMismatch { expected: u16, actual: u16 },
}

impl DecodeError {
    #[inline]
    pub fn header_parse(expected: usize, actual: usize) -> Self {
        Self::HeaderParse { expected, actual }
    }

    #[inline]
    pub fn length_mismatch(expected: u16, actual: u16) -> Self {
        Self::LengthMismatch { expected, actual }
    }
}
