//! Row mapping and statement building
//!
//! Maps decoded records onto the `telemetry` table columns and builds the
//! single multi-row insert used for a batch.

use chrono::{DateTime, Utc};
use downlink_protocol::TelemetryRecord;
use sqlx::{Postgres, QueryBuilder};

use crate::error::StoreError;

/// Target table
pub const TABLE: &str = "telemetry";

/// Bound columns per row
pub const COLUMNS_PER_ROW: usize = 10;

/// PostgreSQL bind parameter limit per statement
const MAX_BIND_PARAMS: usize = 65_535;

/// Largest batch one insert statement can carry
pub const MAX_ROWS_PER_INSERT: usize = MAX_BIND_PARAMS / COLUMNS_PER_ROW;

/// Table bootstrap, run when schema creation is enabled
pub const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS telemetry (
    id            BIGSERIAL PRIMARY KEY,
    timestamp     TIMESTAMPTZ NOT NULL,
    packet_id     INTEGER NOT NULL,
    seq_flags     INTEGER NOT NULL,
    seq_count     INTEGER NOT NULL,
    subsystem_id  INTEGER NOT NULL,
    temperature   REAL NOT NULL,
    battery       REAL NOT NULL,
    altitude      REAL NOT NULL,
    signal        REAL NOT NULL,
    anomaly_flags INTEGER NOT NULL DEFAULT 0,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Time-range index used by history queries
pub const CREATE_TIMESTAMP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_telemetry_timestamp ON telemetry (timestamp)";

const INSERT_PREFIX: &str = "INSERT INTO telemetry \
(timestamp, packet_id, seq_flags, seq_count, subsystem_id, \
temperature, battery, altitude, signal, anomaly_flags) ";

/// One `telemetry` row, column-typed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRow {
    pub timestamp: DateTime<Utc>,
    pub packet_id: i32,
    pub seq_flags: i32,
    pub seq_count: i32,
    pub subsystem_id: i32,
    pub temperature: f32,
    pub battery: f32,
    pub altitude: f32,
    pub signal: f32,
    pub anomaly_flags: i32,
}

impl TelemetryRow {
    /// Map a record; `index` is its position in the batch, for errors
    ///
    /// The anomaly bitmask is stored bit-for-bit in a signed 32-bit column.
    pub fn from_record(index: usize, record: &TelemetryRecord) -> Result<Self, StoreError> {
        let secs = record.secondary.timestamp;
        let timestamp = i64::try_from(secs)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| StoreError::timestamp_out_of_range(index, secs))?;

        Ok(Self {
            timestamp,
            packet_id: i32::from(record.primary.packet_id),
            seq_flags: i32::from(record.primary.sequence_flags()),
            seq_count: i32::from(record.primary.sequence_count()),
            subsystem_id: i32::from(record.secondary.subsystem_id),
            temperature: record.payload.temperature,
            battery: record.payload.battery,
            altitude: record.payload.altitude,
            signal: record.payload.signal,
            anomaly_flags: record.anomaly_flags.bits() as i32,
        })
    }
}

/// Map every record of a batch, failing on the first unmappable one
pub fn map_batch(records: &[TelemetryRecord]) -> Result<Vec<TelemetryRow>, StoreError> {
    if records.len() > MAX_ROWS_PER_INSERT {
        return Err(StoreError::batch_too_large(
            records.len(),
            MAX_ROWS_PER_INSERT,
        ));
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| TelemetryRow::from_record(index, record))
        .collect()
}

/// Build one multi-row insert covering every row
pub fn build_insert(rows: &[TelemetryRow]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(INSERT_PREFIX);

    builder.push_values(rows.iter().copied(), |mut b, row| {
        b.push_bind(row.timestamp)
            .push_bind(row.packet_id)
            .push_bind(row.seq_flags)
            .push_bind(row.seq_count)
            .push_bind(row.subsystem_id)
            .push_bind(row.temperature)
            .push_bind(row.battery)
            .push_bind(row.altitude)
            .push_bind(row.signal)
            .push_bind(row.anomaly_flags);
    });

    builder
}
