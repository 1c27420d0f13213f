//! Sluice - Metrics
//!
//! Per-listener metric sets and periodic reporting.
//!
//! # Overview
//!
//! This crate provides:
//! - Atomic counters and gauges
//! - `MetricSet`, a named registry scoped to one listener
//! - `ThroughputCounter`, the read/write accounting every listener carries
//! - A provider trait so the reporter can collect without knowing listeners
//! - A periodic reporter with human and JSON output
//!
//! # Design Principles
//!
//! - **Lock-free hot path**: updates are relaxed atomic adds on `Arc`ed
//!   counters resolved once at construction
//! - **Scoped**: every listener owns a fresh set, nothing is global
//! - **Trait-based**: listeners hand out a cloneable provider handle
//!
//! # Metrics Handle Pattern
//!
//! ```text
//! UdpListener (owns Arc<MetricSet> + Arc<ThroughputCounter>)
//!     │
//!     └──► metrics_handle() → Handle (clones Arcs, implements ListenerMetricsProvider)
//!
//! sluice wiring:
//!     1. Create listeners
//!     2. Collect metrics_handle()s into Vec<Arc<dyn ListenerMetricsProvider>>
//!     3. Build MetricsReporter with the handles and spawn run()
//! ```

pub mod format;
mod metric_set;
mod reporter;
mod throughput;
mod traits;

pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use metric_set::{Metric, MetricSet, MetricSnapshot};
pub use reporter::{CollectedListener, MetricsReporter, MetricsReporterBuilder};
pub use throughput::{
    READ_BYTES, READ_BYTES_1SEC, READ_DISCARDED, READ_PACKETS, READ_TRUNCATED,
    ThroughputCounter, WRITTEN_BYTES, WRITTEN_BYTES_1SEC,
};
pub use traits::ListenerMetricsProvider;

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Last-value gauge
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    /// Create a new gauge initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Replace the current value
    #[inline]
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    /// Get the current value
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counter_add_and_inc() {
        let counter = Counter::new();
        counter.inc();
        counter.add(41);
        assert_eq!(counter.get(), 42);
    }

    #[test]
    fn test_counter_concurrent_increments() {
        let counter = Arc::new(Counter::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.inc();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.get(), 8000);
    }

    #[test]
    fn test_gauge_set_replaces() {
        let gauge = Gauge::new();
        gauge.set(10);
        gauge.set(3);
        assert_eq!(gauge.get(), 3);
    }
}
