//! UDP Listener
//!
//! Owns the telemetry socket and feeds raw datagrams to the decode pool.
//!
//! # Design
//!
//! - One socket, one receive loop (a single task owns the socket)
//! - Every datagram is copied into its own `Bytes` before hand-off, so the
//!   receive buffer can be reused immediately
//! - Hand-off is a non-blocking `try_send`: when the ingress queue is full the
//!   datagram is dropped and counted, the loop never waits on downstream
//! - Reads are bounded by a read deadline renewed every iteration, so an idle
//!   socket still observes cancellation
//!
//! # Example
//!
//! ```ignore
//! let listener = UdpListener::bind(UdpListenerConfig::default())?;
//! let (ingress_tx, ingress_rx) = crossfire::mpmc::bounded_async(1);
//! let snapshot = listener.run(ingress_tx, cancel.clone()).await;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossfire::{MAsyncTx, TrySendError};
use downlink_protocol::PACKET_LEN;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::drop_tracker::DropTracker;
use crate::metrics::{ListenerMetrics, ListenerMetricsSnapshot};

// =============================================================================
// Constants
// =============================================================================

/// Default telemetry port
const DEFAULT_PORT: u16 = 8089;

/// Default read deadline
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default per-datagram receive buffer
const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1024;

/// Default kernel receive buffer (256KB)
const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

// =============================================================================
// Configuration
// =============================================================================

/// UDP listener configuration
#[derive(Debug, Clone)]
pub struct UdpListenerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port (0 = OS-assigned)
    pub port: u16,

    /// Read deadline per receive attempt
    pub read_timeout: Duration,

    /// Receive buffer per datagram; longer datagrams are truncated
    pub max_datagram_size: usize,

    /// Requested SO_RCVBUF
    pub recv_buffer_size: usize,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl UdpListenerConfig {
    /// Loopback config on an OS-assigned port
    pub fn loopback() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// UDP listener errors
///
/// All of them happen at startup and are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Address did not parse
    #[error("invalid listen address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address
    #[error("failed to bind UDP socket to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Receive buffer cannot hold one packet
    #[error("datagram buffer of {size} bytes cannot hold a {required}-byte packet")]
    BufferTooSmall { size: usize, required: usize },
}

// =============================================================================
// Admission
// =============================================================================

/// Outcome of offering one datagram to the ingress queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A decode worker will process it
    Admitted,
    /// Queue full, datagram discarded
    Dropped,
    /// Every decode worker has stopped
    Closed,
}

/// Offer a datagram to the decode pool without waiting
#[inline]
pub fn admit(ingress: &MAsyncTx<Bytes>, datagram: Bytes) -> Admission {
    match ingress.try_send(datagram) {
        Ok(()) => Admission::Admitted,
        Err(TrySendError::Full(_)) => Admission::Dropped,
        Err(TrySendError::Disconnected(_)) => Admission::Closed,
    }
}

// =============================================================================
// Listener
// =============================================================================

/// Bound UDP listener, ready to run
pub struct UdpListener {
    config: UdpListenerConfig,
    socket: UdpSocket,
    local_addr: SocketAddr,
    metrics: Arc<ListenerMetrics>,
}

impl UdpListener {
    /// Create and bind the socket
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: UdpListenerConfig) -> Result<Self, ListenerError> {
        if config.max_datagram_size < PACKET_LEN {
            return Err(ListenerError::BufferTooSmall {
                size: config.max_datagram_size,
                required: PACKET_LEN,
            });
        }

        let address = config.bind_address();
        let socket_addr: SocketAddr =
            address
                .parse()
                .map_err(|source| ListenerError::InvalidAddress {
                    address: address.clone(),
                    source,
                })?;

        let socket = create_socket(socket_addr, config.recv_buffer_size).map_err(|source| {
            ListenerError::Bind {
                address: address.clone(),
                source,
            }
        })?;

        let local_addr = socket
            .local_addr()
            .map_err(|source| ListenerError::Bind { address, source })?;

        Ok(Self {
            config,
            socket,
            local_addr,
            metrics: Arc::new(ListenerMetrics::new()),
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared metrics handle, valid after the listener stops
    pub fn metrics(&self) -> Arc<ListenerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the receive loop until cancelled
    ///
    /// Consumes the listener; the socket and the ingress sender are dropped
    /// on return, which closes the ingress queue for the decode pool.
    pub async fn run(
        self,
        ingress: MAsyncTx<Bytes>,
        cancel: CancellationToken,
    ) -> ListenerMetricsSnapshot {
        tracing::info!(
            address = %self.local_addr,
            read_timeout = ?self.config.read_timeout,
            max_datagram_size = self.config.max_datagram_size,
            "UDP listener started"
        );

        let mut recv_buf = vec![0u8; self.config.max_datagram_size];
        let mut drops = DropTracker::new();

        loop {
            let received = tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                result = tokio::time::timeout(
                    self.config.read_timeout,
                    self.socket.recv_from(&mut recv_buf),
                ) => result,
            };

            let (len, peer) = match received {
                // Deadline expired with no traffic
                Err(_) => {
                    drops.tick();
                    continue;
                }
                Ok(Err(e)) => {
                    self.metrics.recv_error();
                    tracing::debug!(error = %e, "UDP recv error");
                    continue;
                }
                Ok(Ok(received)) => received,
            };

            self.metrics.packet_received(len as u64);
            let datagram = Bytes::copy_from_slice(&recv_buf[..len]);

            match admit(&ingress, datagram) {
                Admission::Admitted => self.metrics.packet_admitted(),
                Admission::Dropped => {
                    self.metrics.packet_dropped();
                    drops.record_drop();
                    tracing::trace!(peer = %peer, len, "datagram dropped");
                }
                Admission::Closed => {
                    tracing::warn!("ingress queue closed, UDP listener stopping");
                    break;
                }
            }
        }

        drops.flush();
        drop(ingress);

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            address = %self.local_addr,
            packets_received = snapshot.packets_received,
            packets_admitted = snapshot.packets_admitted,
            packets_dropped = snapshot.packets_dropped,
            recv_errors = snapshot.recv_errors,
            "UDP listener stopped"
        );

        snapshot
    }
}

impl std::fmt::Debug for UdpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpListener")
            .field("local_addr", &self.local_addr)
            .field("config", &self.config)
            .finish()
    }
}

/// Create a non-blocking UDP socket with an enlarged receive buffer
fn create_socket(addr: SocketAddr, recv_buffer_size: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    // No SO_REUSEADDR: a second instance on the same port must fail to bind
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;

    // Set non-blocking for tokio
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
