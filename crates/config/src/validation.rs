//! Configuration validation
//!
//! Validates config consistency:
//! - Worker counts and queue capacities are non-zero
//! - The receive buffer can hold a full packet
//! - Batch size fits in one multi-row insert
//! - A postgres store has a resolvable URL
//! - Anomaly thresholds are finite

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::store::StoreKind;

/// Wire packet size; smaller receive buffers truncate every packet
const MIN_DATAGRAM_SIZE: usize = 32;

/// PostgreSQL bind parameter limit per statement
const MAX_BIND_PARAMS: usize = 65_535;

/// Bound columns per persisted row
const COLUMNS_PER_ROW: usize = 10;

/// Largest batch a single multi-row insert can carry
pub const MAX_BATCH_SIZE: usize = MAX_BIND_PARAMS / COLUMNS_PER_ROW;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_listener(config)?;
    validate_pipeline(config)?;
    validate_writer(config)?;
    validate_store(config)?;
    validate_anomaly(config)?;
    Ok(())
}

fn validate_listener(config: &Config) -> Result<()> {
    let listener = &config.listener;

    if listener.address.is_empty() {
        return Err(ConfigError::missing_field(
            "listener",
            "address",
            "use \"0.0.0.0\" to listen on all interfaces",
        ));
    }
    if listener.read_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "listener",
            "read_timeout",
            "must be greater than 0s",
        ));
    }
    if listener.max_datagram_size < MIN_DATAGRAM_SIZE {
        return Err(ConfigError::invalid_value(
            "listener",
            "max_datagram_size",
            format!("must be at least {MIN_DATAGRAM_SIZE} bytes"),
        ));
    }
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    let pipeline = &config.pipeline;

    let counts = [
        ("decode_workers", pipeline.decode_workers),
        ("validate_workers", pipeline.validate_workers),
        ("ingress_queue_size", pipeline.ingress_queue_size),
        ("validate_queue_size", pipeline.validate_queue_size),
        ("alert_queue_size", pipeline.alert_queue_size),
        ("persist_queue_size", pipeline.persist_queue_size),
        ("error_queue_size", pipeline.error_queue_size),
    ];

    for (field, value) in counts {
        if value == 0 {
            return Err(ConfigError::invalid_value(
                "pipeline",
                field,
                "must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_writer(config: &Config) -> Result<()> {
    let batch_size = config.writer.batch_size;

    if batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "writer",
            "batch_size",
            "must be at least 1",
        ));
    }
    if batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::invalid_value(
            "writer",
            "batch_size",
            format!("must be at most {MAX_BATCH_SIZE} (one insert statement per batch)"),
        ));
    }
    Ok(())
}

fn validate_store(config: &Config) -> Result<()> {
    let store = &config.store;

    if store.kind != StoreKind::Postgres {
        return Ok(());
    }
    if store.resolved_url().is_none() {
        return Err(ConfigError::missing_field(
            "store",
            "url",
            format!("set it in the config file or export {}", store.url_env),
        ));
    }
    if store.max_connections == 0 {
        return Err(ConfigError::invalid_value(
            "store",
            "max_connections",
            "must be at least 1",
        ));
    }
    if store.connect_attempts == 0 {
        return Err(ConfigError::invalid_value(
            "store",
            "connect_attempts",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_anomaly(config: &Config) -> Result<()> {
    let anomaly = &config.anomaly;

    let thresholds = [
        ("temperature_max", anomaly.temperature_max),
        ("battery_min", anomaly.battery_min),
        ("altitude_min", anomaly.altitude_min),
        ("signal_min", anomaly.signal_min),
    ];

    for (field, value) in thresholds {
        if !value.is_finite() {
            return Err(ConfigError::invalid_value(
                "anomaly",
                field,
                "must be a finite number",
            ));
        }
    }
    Ok(())
}
