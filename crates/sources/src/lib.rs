//! Downlink Sources
//!
//! Network ingress for the telemetry pipeline.
//!
//! # Available Sources
//!
//! - **UDP** - One socket, one receive loop, non-blocking hand-off with a
//!   drop-and-count policy when the decode pool is saturated
//!
//! # Design Principles
//!
//! - **Bounded memory**: the listener never blocks on downstream congestion
//! - **Owned datagrams**: each datagram is an independent `Bytes`
//! - **Async I/O**: Built on `tokio` for non-blocking operations
//! - **Explicit counters**: drop accounting lives in `ListenerMetrics`, passed
//!   around as an `Arc` handle
//!
//! # Example
//!
//! ```ignore
//! use downlink_sources::{UdpListener, UdpListenerConfig};
//!
//! let listener = UdpListener::bind(UdpListenerConfig::default())?;
//! let metrics = listener.metrics();
//! let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async(16);
//!
//! tokio::spawn(listener.run(ingress_tx, cancel.clone()));
//! ```

mod drop_tracker;
mod metrics;
pub mod udp;

pub use drop_tracker::DropTracker;
pub use metrics::{ListenerMetrics, ListenerMetricsSnapshot};
pub use udp::{Admission, ListenerError, UdpListener, UdpListenerConfig, admit};
