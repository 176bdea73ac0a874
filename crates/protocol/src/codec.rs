//! Packet codec
//!
//! Pure functions between the 32-byte wire layout and [`TelemetryRecord`].
//! All integers and floats are big-endian.
//!
//! ```text
//! offset 0  u16 PacketID
//! offset 2  u16 SequenceControl
//! offset 4  u16 Length (= 25)
//! offset 6  u64 Timestamp
//! offset 14 u16 SubsystemID
//! offset 16 f32 Temperature
//! offset 20 f32 Battery
//! offset 24 f32 Altitude
//! offset 28 f32 Signal
//! ```
//!
//! The codec checks structure only. Range checks belong to the validate stage.

use bytes::{Buf, BufMut};

use crate::error::DecodeError;
use crate::packet::{
    EXPECTED_LENGTH_FIELD, PACKET_LEN, PrimaryHeader, SecondaryHeader, TelemetryPayload,
    TelemetryRecord,
};

/// Encode a record into its wire form
///
/// `Length` is always written from the fixed payload shape, whatever the
/// record's header carries. Anomaly flags are not part of the wire format.
pub fn encode(record: &TelemetryRecord) -> [u8; PACKET_LEN] {
    let mut out = [0u8; PACKET_LEN];
    let mut buf = &mut out[..];

    buf.put_u16(record.primary.packet_id);
    buf.put_u16(record.primary.sequence_control);
    buf.put_u16(EXPECTED_LENGTH_FIELD);

    buf.put_u64(record.secondary.timestamp);
    buf.put_u16(record.secondary.subsystem_id);

    buf.put_f32(record.payload.temperature);
    buf.put_f32(record.payload.battery);
    buf.put_f32(record.payload.altitude);
    buf.put_f32(record.payload.signal);

    out
}

/// Decode a wire packet
///
/// Parses primary header, secondary header, then payload. Bytes past the
/// first [`PACKET_LEN`] are ignored.
///
/// # Errors
///
/// - [`DecodeError::HeaderParse`] if fewer than 32 bytes are available
/// - [`DecodeError::LengthMismatch`] if `Length` is not the expected constant
pub fn decode(packet: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    if packet.len() < PACKET_LEN {
        return Err(DecodeError::header_parse(PACKET_LEN, packet.len()));
    }

    let mut buf = &packet[..PACKET_LEN];

    let packet_id = buf.get_u16();
    let sequence_control = buf.get_u16();
    let length = buf.get_u16();

    if length != EXPECTED_LENGTH_FIELD {
        return Err(DecodeError::length_mismatch(EXPECTED_LENGTH_FIELD, length));
    }

    let primary = PrimaryHeader {
        packet_id,
        sequence_control,
        length,
    };

    let timestamp = buf.get_u64();
    let subsystem_id = buf.get_u16();
    let secondary = SecondaryHeader {
        timestamp,
        subsystem_id,
    };

    let temperature = buf.get_f32();
    let battery = buf.get_f32();
    let altitude = buf.get_f32();
    let signal = buf.get_f32();
    let payload = TelemetryPayload {
        temperature,
        battery,
        altitude,
        signal,
    };

    Ok(TelemetryRecord::new(primary, secondary, payload))
}
