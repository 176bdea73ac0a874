//! Serve command - Run the ingestion pipeline
//!
//! Acquires the store and the UDP socket, runs the pipeline until SIGINT or
//! SIGTERM, then releases the store once every stage has stopped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use downlink_config::{Config, StoreConfig, StoreKind};
use downlink_pipeline::{AnomalyThresholds, BatchWriterConfig, Pipeline, PipelineConfig};
use downlink_sinks::{NullStore, PostgresConfig, PostgresStore, TelemetryStore};
use downlink_sources::{UdpListener, UdpListenerConfig};

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.toml";

/// Load the configuration
///
/// An explicit path must exist. Without one, the default path is used if
/// present, otherwise built-in defaults. Returns the file actually read.
pub fn load_config(path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "config file not found: {}",
                    path.display()
                ));
            }
            let config = Config::from_file(path).context("failed to load configuration")?;
            Ok((config, Some(path.to_path_buf())))
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            let (config, found) =
                Config::load_or_default(&default_path).context("failed to load configuration")?;
            Ok((config, found.then_some(default_path)))
        }
    }
}

/// Run the serve command
pub async fn run(config: Config, source: Option<&Path>) -> Result<()> {
    let config_label = source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_label,
        "downlink starting"
    );

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            wait_for_shutdown().await;
            info!("shutdown signal received, stopping pipeline...");
            cancel.cancel();
        }
    });

    let result = run_server(config, cancel).await;
    signal_task.abort();

    if let Err(e) = &result {
        error!(error = %e, "server error");
        return result;
    }

    info!("downlink shutdown complete");
    Ok(())
}

/// Acquire resources, run the pipeline until `cancel` fires, release them
async fn run_server(config: Config, cancel: CancellationToken) -> Result<()> {
    let store = connect_store(&config.store, &cancel).await?;

    let listener = match UdpListener::bind(listener_config(&config)) {
        Ok(listener) => listener,
        Err(e) => {
            store.close().await;
            return Err(e).context("failed to bind UDP listener");
        }
    };

    info!(
        address = %listener.local_addr(),
        store = store.kind(),
        "downlink running"
    );

    let pipeline = Pipeline::new(pipeline_config(&config), Arc::clone(&store));
    let summary = pipeline.run(listener, cancel).await;

    if !summary.clean_shutdown {
        warn!("some stages did not stop before the shutdown timeout");
    }
    if summary.packets_dropped() > 0 {
        warn!(
            packets_dropped = summary.packets_dropped(),
            "packets were shed at ingress during this run"
        );
    }

    store.close().await;
    Ok(())
}

/// Connect the configured store; failure here is fatal
async fn connect_store(
    config: &StoreConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn TelemetryStore>> {
    match config.kind {
        StoreKind::Postgres => {
            let url = config.resolved_url().with_context(|| {
                format!("no store URL configured (set [store] url or {})", config.url_env)
            })?;
            let pg_config = postgres_config(config, url);

            info!(url = %pg_config.redacted_url(), "connecting to telemetry store");
            let store = PostgresStore::connect(&pg_config, cancel)
                .await
                .context("failed to connect to telemetry store")?;
            Ok(Arc::new(store))
        }
        StoreKind::Null => {
            warn!("null store configured, telemetry will not be persisted");
            Ok(Arc::new(NullStore::new()))
        }
    }
}

fn postgres_config(config: &StoreConfig, url: String) -> PostgresConfig {
    PostgresConfig {
        idle_timeout: config.idle_timeout,
        ..PostgresConfig::default()
            .with_url(url)
            .with_max_connections(config.max_connections)
            .with_connect_retry(
                config.connect_attempts,
                config.connect_backoff,
                config.connect_max_backoff,
            )
            .with_create_schema(config.create_schema)
    }
}

fn listener_config(config: &Config) -> UdpListenerConfig {
    let listener = &config.listener;
    UdpListenerConfig {
        address: listener.address.clone(),
        port: listener.port,
        read_timeout: listener.read_timeout,
        max_datagram_size: listener.max_datagram_size,
        recv_buffer_size: listener.recv_buffer_size,
    }
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    let pipeline = &config.pipeline;
    let anomaly = &config.anomaly;
    PipelineConfig {
        decode_workers: pipeline.decode_workers,
        validate_workers: pipeline.validate_workers,
        ingress_queue_size: pipeline.ingress_queue_size,
        validate_queue_size: pipeline.validate_queue_size,
        alert_queue_size: pipeline.alert_queue_size,
        persist_queue_size: pipeline.persist_queue_size,
        error_queue_size: pipeline.error_queue_size,
        shutdown_timeout: pipeline.shutdown_timeout,
        writer: BatchWriterConfig {
            batch_size: config.writer.batch_size,
            flush_interval: config.writer.effective_flush_interval(),
        },
        thresholds: AnomalyThresholds {
            temperature_max: anomaly.temperature_max,
            battery_min: anomaly.battery_min,
            altitude_min: anomaly.altitude_min,
            signal_min: anomaly.signal_min,
        },
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
