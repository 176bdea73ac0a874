//! PostgreSQL telemetry store
//!
//! Production store backed by a `sqlx` connection pool.
//!
//! # Design
//!
//! - **One transaction per batch**: begin, one multi-row insert, commit
//! - **Lossy on failure**: a failed batch is rolled back and reported, never
//!   retried
//! - **Startup retry**: connecting retries with exponential backoff and gives
//!   up after a fixed number of attempts
//! - **Schema bootstrap**: optional `CREATE TABLE IF NOT EXISTS` at startup
//!
//! # Example
//!
//! ```ignore
//! let config = PostgresConfig::default().with_url("postgres://localhost/telemetry");
//! let store = PostgresStore::connect(&config, &cancel).await?;
//! store.insert_batch(&records).await?;
//! store.close().await;
//! ```

mod config;
mod rows;

pub use config::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_CONNECT_BACKOFF,
    DEFAULT_CONNECT_MAX_BACKOFF, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS, PostgresConfig,
};
pub use rows::{
    COLUMNS_PER_ROW, CREATE_TABLE, CREATE_TIMESTAMP_INDEX, MAX_ROWS_PER_INSERT, TABLE,
    TelemetryRow, build_insert, map_batch,
};

use async_trait::async_trait;
use downlink_protocol::TelemetryRecord;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::TelemetryStore;

/// PostgreSQL-backed telemetry store
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect with bounded exponential backoff
    ///
    /// Each failed attempt doubles the delay up to `connect_max_backoff`.
    /// Cancellation during a backoff sleep aborts with
    /// [`StoreError::ConnectCancelled`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConnectExhausted`] after `connect_attempts` failures
    /// - [`StoreError::Database`] if schema bootstrap fails
    pub async fn connect(
        config: &PostgresConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, StoreError> {
        let max_attempts = config.connect_attempts.max(1);
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(Some(config.idle_timeout))
            .acquire_timeout(config.acquire_timeout);

        let mut delay = config.connect_backoff;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::ConnectCancelled { attempts: attempt });
            }
            attempt += 1;

            match options.clone().connect(&config.url).await {
                Ok(pool) => {
                    tracing::info!(
                        url = %config.redacted_url(),
                        attempt,
                        max_connections = config.max_connections,
                        "connected to telemetry store"
                    );

                    let store = Self::from_pool(pool);
                    if config.create_schema {
                        store.ensure_schema().await?;
                    }
                    return Ok(store);
                }
                Err(e) if attempt >= max_attempts => {
                    return Err(StoreError::ConnectExhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "store connect failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(StoreError::ConnectCancelled { attempts: attempt });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = std::cmp::min(delay * 2, config.connect_max_backoff);
                }
            }
        }
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the telemetry table and its timestamp index if missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_TIMESTAMP_INDEX)
            .execute(&self.pool)
            .await?;

        tracing::debug!(table = TABLE, "telemetry schema ready");
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for PostgresStore {
    async fn insert_batch(&self, records: &[TelemetryRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let rows = map_batch(records)?;
        let mut tx = self.pool.begin().await?;

        let mut insert = build_insert(&rows);
        if let Err(e) = insert.build().execute(&mut *tx).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "telemetry batch rollback failed");
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("telemetry store pool closed");
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod postgres_test;
