//! Rate-limited drop logging
//!
//! Aggregates ingress drops and emits at most one line per interval,
//! escalating to ERROR when the drop rate passes a critical threshold.
//!
//! Owned by the single listener task, so plain fields are enough.

use std::time::{Duration, Instant};

/// Minimum time between two drop log lines
const LOG_INTERVAL: Duration = Duration::from_millis(1000);

/// Drops per interval that escalate the log line to ERROR
const CRITICAL_DROP_THRESHOLD: u64 = 100;

/// Aggregates dropped datagrams into periodic log lines
#[derive(Debug)]
pub struct DropTracker {
    /// Drops since the last log line
    interval_drops: u64,
    /// Drops since creation
    total_drops: u64,
    last_log: Instant,
}

impl DropTracker {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Tracker whose first interval starts at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            interval_drops: 0,
            total_drops: 0,
            last_log: start,
        }
    }

    /// Record a drop; returns true if a log line was emitted
    #[inline]
    pub fn record_drop(&mut self) -> bool {
        self.record_drop_at(Instant::now())
    }

    pub fn record_drop_at(&mut self, now: Instant) -> bool {
        self.interval_drops += 1;
        self.total_drops += 1;
        self.maybe_log(now)
    }

    /// Emit pending drops if the interval has elapsed
    ///
    /// Called on idle read deadlines so the tail of a burst is still reported.
    pub fn tick(&mut self) -> bool {
        self.maybe_log(Instant::now())
    }

    /// Log whatever is pending, ignoring the interval
    ///
    /// Returns the number of drops that were pending.
    pub fn flush(&mut self) -> u64 {
        let drops = std::mem::take(&mut self.interval_drops);
        if drops > 0 {
            Self::emit(drops, self.total_drops);
        }
        self.last_log = Instant::now();
        drops
    }

    /// Drops not yet reported
    pub fn pending(&self) -> u64 {
        self.interval_drops
    }

    /// Drops since creation
    pub fn total(&self) -> u64 {
        self.total_drops
    }

    fn maybe_log(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_log) < LOG_INTERVAL {
            return false;
        }
        self.last_log = now;

        let drops = std::mem::take(&mut self.interval_drops);
        if drops == 0 {
            return false;
        }

        Self::emit(drops, self.total_drops);
        true
    }

    fn emit(drops: u64, total: u64) {
        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                dropped_packets = drops,
                total_dropped = total,
                threshold = CRITICAL_DROP_THRESHOLD,
                "CRITICAL: decode pool saturated, shedding ingress"
            );
        } else {
            tracing::warn!(
                dropped_packets = drops,
                total_dropped = total,
                "ingress packets dropped (decode pool busy)"
            );
        }
    }
}

impl Default for DropTracker {
    fn default() -> Self {
        Self::new()
    }
}
