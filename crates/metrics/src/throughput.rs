//! Listener throughput accounting
//!
//! # Design
//!
//! - Registered into a fresh `MetricSet` at construction, one per listener
//! - Shared as `Arc<ThroughputCounter>` by every reader and stage of the
//!   listener; all updates are relaxed atomic adds
//! - Totals are monotonic for the listener's lifetime
//! - `tick()` turns the totals into per-second gauges; the listener's
//!   ticker calls it once a second while launched

use crate::{Counter, Gauge, Metric, MetricSet, MetricSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Metric names
// =============================================================================

/// Total payload bytes read
pub const READ_BYTES: &str = "read.bytes";

/// Total datagrams read
pub const READ_PACKETS: &str = "read.packets";

/// Total bytes handed downstream
pub const WRITTEN_BYTES: &str = "written.bytes";

/// Bytes read during the last tick period
pub const READ_BYTES_1SEC: &str = "read.bytes.1sec";

/// Bytes handed downstream during the last tick period
pub const WRITTEN_BYTES_1SEC: &str = "written.bytes.1sec";

/// Datagrams cut down to the receive buffer size
pub const READ_TRUNCATED: &str = "read.truncated";

/// Datagrams dropped for exceeding the receive buffer size
pub const READ_DISCARDED: &str = "read.discarded";

// =============================================================================
// ThroughputCounter
// =============================================================================

/// Byte and packet counters for one listener
#[derive(Debug)]
pub struct ThroughputCounter {
    set: Arc<MetricSet>,
    read_bytes: Arc<Counter>,
    read_packets: Arc<Counter>,
    written_bytes: Arc<Counter>,
    truncated: Arc<Counter>,
    discarded: Arc<Counter>,
    read_bytes_1sec: Arc<Gauge>,
    written_bytes_1sec: Arc<Gauge>,
    last_read: AtomicU64,
    last_written: AtomicU64,
}

impl ThroughputCounter {
    /// Create a counter registered into a new, empty metric set
    pub fn new() -> Self {
        let set = Arc::new(MetricSet::new());

        let counter = |name: &str| {
            let c = Arc::new(Counter::new());
            set.insert(name, Metric::Counter(Arc::clone(&c)));
            c
        };
        let read_bytes = counter(READ_BYTES);
        let read_packets = counter(READ_PACKETS);
        let written_bytes = counter(WRITTEN_BYTES);
        let truncated = counter(READ_TRUNCATED);
        let discarded = counter(READ_DISCARDED);

        let gauge = |name: &str| {
            let g = Arc::new(Gauge::new());
            set.insert(name, Metric::Gauge(Arc::clone(&g)));
            g
        };
        let read_bytes_1sec = gauge(READ_BYTES_1SEC);
        let written_bytes_1sec = gauge(WRITTEN_BYTES_1SEC);

        Self {
            set,
            read_bytes,
            read_packets,
            written_bytes,
            truncated,
            discarded,
            read_bytes_1sec,
            written_bytes_1sec,
            last_read: AtomicU64::new(0),
            last_written: AtomicU64::new(0),
        }
    }

    /// The metric set these counters live in
    #[inline]
    pub fn metric_set(&self) -> &Arc<MetricSet> {
        &self.set
    }

    /// Record one datagram of `bytes` read from the socket
    #[inline]
    pub fn record_read(&self, bytes: usize) {
        self.read_bytes.add(bytes as u64);
        self.read_packets.inc();
    }

    /// Record `bytes` handed downstream
    #[inline]
    pub fn record_written(&self, bytes: usize) {
        self.written_bytes.add(bytes as u64);
    }

    /// Record a datagram cut down to the receive buffer size
    #[inline]
    pub fn record_truncated(&self) {
        self.truncated.inc();
    }

    /// Record a datagram dropped for exceeding the receive buffer size
    #[inline]
    pub fn record_discarded(&self) {
        self.discarded.inc();
    }

    /// Refresh the per-second gauges from the totals since the last tick
    pub fn tick(&self) {
        let read = self.read_bytes.get();
        let prev = self.last_read.swap(read, Ordering::Relaxed);
        self.read_bytes_1sec.set(read.saturating_sub(prev));

        let written = self.written_bytes.get();
        let prev = self.last_written.swap(written, Ordering::Relaxed);
        self.written_bytes_1sec.set(written.saturating_sub(prev));
    }

    pub fn read_bytes(&self) -> u64 {
        self.read_bytes.get()
    }

    pub fn read_packets(&self) -> u64 {
        self.read_packets.get()
    }

    pub fn written_bytes(&self) -> u64 {
        self.written_bytes.get()
    }

    /// Point-in-time copy of the whole metric set
    pub fn snapshot(&self) -> MetricSnapshot {
        self.set.snapshot()
    }
}

impl Default for ThroughputCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "throughput_test.rs"]
mod throughput_test;
