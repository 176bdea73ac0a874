//! Tests for the PostgreSQL store
//!
//! Statement building and row mapping are checked without a database.
//! Connect tests target a closed loopback port.

use std::time::Duration;

use downlink_protocol::{
    AnomalyFlags, PrimaryHeader, SecondaryHeader, TelemetryPayload, TelemetryRecord,
};
use tokio_util::sync::CancellationToken;

use super::*;

fn record(timestamp: u64, sequence_count: u16, flags: AnomalyFlags) -> TelemetryRecord {
    let mut record = TelemetryRecord::new(
        PrimaryHeader::new(0, 0, true, 0x01, 0b11, sequence_count),
        SecondaryHeader {
            timestamp,
            subsystem_id: 1,
        },
        TelemetryPayload {
            temperature: 21.5,
            battery: 75.0,
            altitude: 510.0,
            signal: -60.0,
        },
    );
    record.anomaly_flags = flags;
    record
}

/// Closed port on loopback; connecting fails fast
fn unreachable_config() -> PostgresConfig {
    PostgresConfig::default()
        .with_url("postgres://downlink@127.0.0.1:1/telemetry")
        .with_acquire_timeout(Duration::from_millis(200))
        .with_connect_retry(2, Duration::from_millis(10), Duration::from_millis(20))
        .with_create_schema(false)
}

// =============================================================================
// Row mapping
// =============================================================================

#[test]
fn test_row_extracts_sequence_fields() {
    let row = TelemetryRow::from_record(0, &record(1_700_000_000, 0x1234, AnomalyFlags::empty()))
        .unwrap();

    assert_eq!(row.packet_id, 0x0801);
    assert_eq!(row.seq_flags, 0b11);
    assert_eq!(row.seq_count, 0x1234);
    assert_eq!(row.subsystem_id, 1);
    assert_eq!(row.timestamp.timestamp(), 1_700_000_000);
    assert_eq!(row.temperature, 21.5);
    assert_eq!(row.signal, -60.0);
}

#[test]
fn test_row_stores_flags_bit_for_bit() {
    let row = TelemetryRow::from_record(0, &record(0, 1, AnomalyFlags::from_bits(0b1111))).unwrap();
    assert_eq!(row.anomaly_flags, 0b1111);

    let row =
        TelemetryRow::from_record(0, &record(0, 1, AnomalyFlags::from_bits(0x8000_0000))).unwrap();
    assert_eq!(row.anomaly_flags, i32::MIN);
}

#[test]
fn test_row_rejects_unrepresentable_timestamp() {
    let err = TelemetryRow::from_record(7, &record(u64::MAX, 1, AnomalyFlags::empty())).unwrap_err();
    assert!(matches!(
        err,
        StoreError::TimestampOutOfRange {
            index: 7,
            timestamp: u64::MAX
        }
    ));
}

#[test]
fn test_map_batch_fails_whole_batch() {
    let records = vec![
        record(1_700_000_000, 1, AnomalyFlags::empty()),
        record(u64::MAX, 2, AnomalyFlags::empty()),
        record(1_700_000_002, 3, AnomalyFlags::empty()),
    ];

    let err = map_batch(&records).unwrap_err();
    assert!(matches!(err, StoreError::TimestampOutOfRange { index: 1, .. }));
}

#[test]
fn test_map_batch_rejects_oversized_batch() {
    let records = vec![TelemetryRecord::default(); MAX_ROWS_PER_INSERT + 1];
    let err = map_batch(&records).unwrap_err();
    assert!(matches!(err, StoreError::BatchTooLarge { max, .. } if max == MAX_ROWS_PER_INSERT));
}

// =============================================================================
// Statement building
// =============================================================================

#[test]
fn test_build_insert_single_statement() {
    let records: Vec<_> = (0..3)
        .map(|i| record(1_700_000_000 + i, i as u16, AnomalyFlags::empty()))
        .collect();
    let rows = map_batch(&records).unwrap();

    let builder = build_insert(&rows);
    let sql = builder.sql();

    assert!(sql.starts_with(
        "INSERT INTO telemetry (timestamp, packet_id, seq_flags, seq_count, subsystem_id, \
         temperature, battery, altitude, signal, anomaly_flags) VALUES ("
    ));
    assert_eq!(sql.matches('$').count(), 3 * COLUMNS_PER_ROW);
    assert!(sql.contains("$1,"));
    assert!(sql.ends_with("$30)"));
    assert_eq!(sql.matches("INSERT").count(), 1);
}

#[test]
fn test_max_rows_fit_bind_limit() {
    assert_eq!(MAX_ROWS_PER_INSERT, 6553);
    assert!(MAX_ROWS_PER_INSERT * COLUMNS_PER_ROW <= 65_535);
}

#[test]
fn test_schema_statements() {
    assert!(CREATE_TABLE.starts_with("CREATE TABLE IF NOT EXISTS telemetry"));
    for column in [
        "timestamp",
        "packet_id",
        "seq_flags",
        "seq_count",
        "subsystem_id",
        "temperature",
        "battery",
        "altitude",
        "signal",
        "anomaly_flags",
    ] {
        assert!(CREATE_TABLE.contains(column), "missing column {column}");
    }
    assert!(CREATE_TIMESTAMP_INDEX.contains("ON telemetry (timestamp)"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = PostgresConfig::default();
    assert_eq!(config.max_connections, 50);
    assert_eq!(config.idle_timeout, Duration::from_secs(300));
    assert_eq!(config.connect_attempts, 10);
    assert_eq!(config.connect_backoff, Duration::from_secs(1));
    assert!(config.create_schema);
}

#[test]
fn test_redacted_url_hides_password() {
    let config = PostgresConfig::default().with_url("postgres://telemetry:s3cret@db:5432/telemetry");
    assert_eq!(
        config.redacted_url(),
        "postgres://telemetry:***@db:5432/telemetry"
    );
    assert!(!format!("{config:?}").contains("s3cret"));

    let no_password = PostgresConfig::default().with_url("postgres://telemetry@db/telemetry");
    assert_eq!(no_password.redacted_url(), "postgres://telemetry@db/telemetry");
}

// =============================================================================
// Connect with retry
// =============================================================================

#[tokio::test]
async fn test_connect_exhausts_attempts() {
    let cancel = CancellationToken::new();

    let err = PostgresStore::connect(&unreachable_config(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::ConnectExhausted { attempts: 2, .. }));
    assert!(err.to_string().contains("after 2 attempts"));
}

#[tokio::test]
async fn test_connect_observes_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = unreachable_config().with_connect_retry(
        10,
        Duration::from_secs(30),
        Duration::from_secs(60),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        PostgresStore::connect(&config, &cancel),
    )
    .await
    .expect("connect ignored cancellation");

    assert!(matches!(result, Err(StoreError::ConnectCancelled { .. })));
}
