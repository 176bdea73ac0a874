//! Telemetry packet structures
//!
//! In-memory view of one wire packet: primary header, secondary header and
//! the four-float payload. Packed bit-fields are kept as plain integers with
//! shift/mask accessors so the layout never depends on host byte order.

use crate::anomaly::AnomalyFlags;

// =============================================================================
// Layout constants
// =============================================================================

/// Primary header size in bytes
pub const PRIMARY_HEADER_LEN: usize = 6;

/// Secondary header size in bytes
pub const SECONDARY_HEADER_LEN: usize = 10;

/// Payload size in bytes (four f32 values)
pub const PAYLOAD_LEN: usize = 16;

/// Total wire packet size
pub const PACKET_LEN: usize = PRIMARY_HEADER_LEN + SECONDARY_HEADER_LEN + PAYLOAD_LEN;

/// Value the `Length` field must carry for this payload shape (25)
pub const EXPECTED_LENGTH_FIELD: u16 = (SECONDARY_HEADER_LEN + PAYLOAD_LEN - 1) as u16;

/// Packet version used by current producers
pub const PACKET_VERSION: u8 = 0;

/// Packet type for telemetry (0 = TM)
pub const PACKET_TYPE_TELEMETRY: u8 = 0;

/// Sequence flags for a standalone (unsegmented) packet
pub const SEQ_FLAGS_STANDALONE: u8 = 0b11;

/// Subsystem id of the main bus telemetry source
pub const SUBSYSTEM_MAIN_BUS: u16 = 0x0001;

// Bit-field masks
const VERSION_SHIFT: u16 = 13;
const VERSION_MASK: u16 = 0b111;
const TYPE_SHIFT: u16 = 12;
const SEC_HDR_SHIFT: u16 = 11;
const APID_MASK: u16 = 0x07FF;
const SEQ_FLAGS_SHIFT: u16 = 14;
const SEQ_FLAGS_MASK: u16 = 0b11;
const SEQ_COUNT_MASK: u16 = 0x3FFF;

// =============================================================================
// Primary Header
// =============================================================================

/// Primary header (6 bytes on the wire)
///
/// - `packet_id` = version(3) | type(1) | secondary-header flag(1) | APID(11)
/// - `sequence_control` = sequence flags(2) | sequence count(14)
/// - `length` = secondary header size + payload size - 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimaryHeader {
    pub packet_id: u16,
    pub sequence_control: u16,
    pub length: u16,
}

impl PrimaryHeader {
    /// Pack a header from its individual fields
    ///
    /// Every field is masked to its width, so oversized inputs are truncated
    /// rather than bleeding into neighbouring bits.
    pub fn new(
        version: u8,
        packet_type: u8,
        secondary_header: bool,
        apid: u16,
        sequence_flags: u8,
        sequence_count: u16,
    ) -> Self {
        let packet_id = ((version as u16 & VERSION_MASK) << VERSION_SHIFT)
            | ((packet_type as u16 & 0b1) << TYPE_SHIFT)
            | ((secondary_header as u16) << SEC_HDR_SHIFT)
            | (apid & APID_MASK);

        let sequence_control = ((sequence_flags as u16 & SEQ_FLAGS_MASK) << SEQ_FLAGS_SHIFT)
            | (sequence_count & SEQ_COUNT_MASK);

        Self {
            packet_id,
            sequence_control,
            length: EXPECTED_LENGTH_FIELD,
        }
    }

    /// Packet version (top 3 bits of `packet_id`)
    #[inline]
    pub fn version(&self) -> u8 {
        ((self.packet_id >> VERSION_SHIFT) & VERSION_MASK) as u8
    }

    /// Packet type bit (0 = telemetry, 1 = telecommand)
    #[inline]
    pub fn packet_type(&self) -> u8 {
        ((self.packet_id >> TYPE_SHIFT) & 0b1) as u8
    }

    /// Whether the secondary header flag is set
    #[inline]
    pub fn has_secondary_header(&self) -> bool {
        (self.packet_id >> SEC_HDR_SHIFT) & 0b1 == 1
    }

    /// Application process identifier (low 11 bits of `packet_id`)
    #[inline]
    pub fn apid(&self) -> u16 {
        self.packet_id & APID_MASK
    }

    /// Sequence flags (top 2 bits of `sequence_control`)
    #[inline]
    pub fn sequence_flags(&self) -> u8 {
        ((self.sequence_control >> SEQ_FLAGS_SHIFT) & SEQ_FLAGS_MASK) as u8
    }

    /// Sequence count (low 14 bits of `sequence_control`)
    #[inline]
    pub fn sequence_count(&self) -> u16 {
        self.sequence_control & SEQ_COUNT_MASK
    }
}

// =============================================================================
// Secondary Header
// =============================================================================

/// Secondary header (10 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecondaryHeader {
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Subsystem identifier (power, thermal, ...)
    pub subsystem_id: u16,
}

// =============================================================================
// Payload
// =============================================================================

/// Bus readings carried by every packet
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryPayload {
    /// Temperature in degrees Celsius
    pub temperature: f32,
    /// Battery charge in percent
    pub battery: f32,
    /// Altitude in kilometers
    pub altitude: f32,
    /// Signal strength in dB
    pub signal: f32,
}

// =============================================================================
// Record
// =============================================================================

/// A decoded packet plus its anomaly tags
///
/// Created by the decode stage with empty flags, tagged exactly once by the
/// validate stage, read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRecord {
    pub primary: PrimaryHeader,
    pub secondary: SecondaryHeader,
    pub payload: TelemetryPayload,
    pub anomaly_flags: AnomalyFlags,
}

impl TelemetryRecord {
    /// Create an untagged record
    pub fn new(
        primary: PrimaryHeader,
        secondary: SecondaryHeader,
        payload: TelemetryPayload,
    ) -> Self {
        Self {
            primary,
            secondary,
            payload,
            anomaly_flags: AnomalyFlags::empty(),
        }
    }

    /// Whether any anomaly bit is set
    #[inline]
    pub fn is_anomalous(&self) -> bool {
        !self.anomaly_flags.is_empty()
    }
}
