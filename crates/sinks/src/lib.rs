//! Downlink - Sinks
//!
//! Telemetry stores behind the batch writer.
//!
//! # Architecture
//!
//! The batch writer owns the accumulated batch and hands it to a store as a
//! slice. The store persists it in one transaction or reports an error; it
//! never retries and never keeps a copy.
//!
//! ```text
//! [Batch Writer] --&[TelemetryRecord]--> [TelemetryStore] --> [Database]
//! ```
//!
//! # Available Stores
//!
//! | Store | Purpose |
//! |-------|---------|
//! | `postgres` | Production relational store (sqlx pool) |
//! | `null` | Load testing (count and discard) |
//!
//! # Example
//!
//! ```ignore
//! use downlink_sinks::{PostgresConfig, PostgresStore, TelemetryStore};
//!
//! let config = PostgresConfig::default().with_url(url);
//! let store = PostgresStore::connect(&config, &cancel).await?;
//! store.insert_batch(&records).await?;
//! ```

mod error;
mod store;

/// Null store - discards all batches (for load testing)
pub mod null;

/// PostgreSQL store - production persistence
pub mod postgres;

pub use error::StoreError;
pub use null::NullStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use store::TelemetryStore;
