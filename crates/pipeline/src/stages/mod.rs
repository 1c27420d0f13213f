//! Built-in stages of the base pipeline

mod decode;
mod handoff;
mod logging;
mod throughput;

pub use decode::DecodeStage;
pub use handoff::HandoffStage;
pub use logging::LoggingStage;
pub use throughput::ThroughputStage;

use crate::MessageConsumer;
use sluice_metrics::ThroughputCounter;
use std::sync::Arc;

/// Optional per-datagram logging
pub const LOGGING: &str = "logging";

/// Byte and packet accounting
pub const THROUGHPUT: &str = "throughput";

/// Datagram to `RawMessage`
pub const DECODE: &str = "decode";

/// Gives messages to the consumer
pub const HANDOFF: &str = "handoff";

/// What the base pipeline is built from
pub struct BaseStages {
    /// Log each datagram at this level, or skip the stage entirely
    pub logging: Option<tracing::Level>,
    /// The owning listener's counters
    pub throughput: Arc<ThroughputCounter>,
    /// Where decoded messages go
    pub consumer: Arc<dyn MessageConsumer>,
}
