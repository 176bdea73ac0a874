//! Listener metrics
//!
//! Lock-free counters updated by the receive loop and readable from any task
//! through an `Arc<ListenerMetrics>` handle.

use std::sync::atomic::{AtomicU64, Ordering};

/// UDP listener counters
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Datagrams read from the socket
    pub packets_received: AtomicU64,

    /// Bytes read from the socket
    pub bytes_received: AtomicU64,

    /// Datagrams handed to the decode pool
    pub packets_admitted: AtomicU64,

    /// Datagrams shed because no decode worker could take them
    pub packets_dropped: AtomicU64,

    /// Socket receive errors
    pub recv_errors: AtomicU64,
}

impl ListenerMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            packets_admitted: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            recv_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn packet_received(&self, bytes: u64) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn packet_admitted(&self) {
        self.packets_admitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn packet_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn recv_error(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> ListenerMetricsSnapshot {
        ListenerMetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            packets_admitted: self.packets_admitted.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of listener counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerMetricsSnapshot {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub packets_admitted: u64,
    pub packets_dropped: u64,
    pub recv_errors: u64,
}
