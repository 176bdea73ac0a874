//! Downlink Protocol - Telemetry packet types and wire codec
//!
//! This crate provides the types that flow through the ingestion pipeline:
//! - `PrimaryHeader` / `SecondaryHeader` / `TelemetryPayload` - packet sections
//! - `TelemetryRecord` - a decoded packet plus its anomaly tags
//! - `AnomalyFlags` - 32-bit anomaly bitmask
//! - `encode` / `decode` - fixed 32-byte big-endian wire format
//!
//! # Design Principles
//!
//! - **Pure codec**: no I/O, no allocation on the decode path
//! - **Copy records**: a record is 48 bytes and moves between stages by value
//! - **Structure only**: decode rejects malformed packets, range checks live
//!   downstream

mod anomaly;
mod codec;
mod error;
mod packet;

pub use anomaly::{ALTITUDE_BIT, AnomalyFlags, BATTERY_BIT, SIGNAL_BIT, TEMPERATURE_BIT};
pub use codec::{decode, encode};
pub use error::DecodeError;
pub use packet::{
    EXPECTED_LENGTH_FIELD, PACKET_LEN, PACKET_TYPE_TELEMETRY, PACKET_VERSION, PAYLOAD_LEN,
    PRIMARY_HEADER_LEN, PrimaryHeader, SECONDARY_HEADER_LEN, SEQ_FLAGS_STANDALONE,
    SUBSYSTEM_MAIN_BUS, SecondaryHeader, TelemetryPayload, TelemetryRecord,
};

// Re-export bytes for convenience
pub use bytes::Bytes;
