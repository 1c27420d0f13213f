//! Metrics provider traits
//!
//! Listeners implement this (through a cloneable handle) so the reporter
//! can collect their metrics without knowing the concrete type.
//!
//! # Design
//!
//! - Traits use `&self` for zero-copy metric access
//! - All providers are `Send + Sync` for thread-safe collection

use crate::MetricSnapshot;

/// Trait for listeners to provide metrics to the reporter
pub trait ListenerMetricsProvider: Send + Sync {
    /// Unique identifier for this listener instance
    fn listener_id(&self) -> &str;

    /// Display name
    fn listener_name(&self) -> &str;

    /// Get a snapshot of current metrics
    fn snapshot(&self) -> MetricSnapshot;
}
