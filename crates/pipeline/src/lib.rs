//! Sluice - Pipeline
//!
//! The ordered stage chain every UDP listener runs its datagrams through.
//!
//! # Architecture
//!
//! ```text
//! socket read ──→ [logging] ──→ throughput ──→ decode ──→ handoff ──→ MessageConsumer
//!   Datagram      (optional)    read.bytes    RawMessage   written.bytes
//! ```
//!
//! # Key Design
//!
//! - **Named, ordered**: stages are keyed by name; callers prepend, append,
//!   splice, replace or disable stages without knowing the base order
//! - **Factory per stage**: each bound socket gets its own stage instances
//! - **Synchronous stages**: no stage awaits; the socket read is the only
//!   suspension point on the inbound path
//! - **Best-effort hand-off**: consumers never block the reader

mod builder;
mod consumer;
mod error;
mod message;
mod stage;
pub mod stages;

pub use builder::{Pipeline, PipelineBuilder, PipelineTemplate, Position, StageOverrides};
pub use consumer::{ChannelConsumer, MessageConsumer, NullConsumer};
pub use error::{PipelineError, Result};
pub use message::{Datagram, Inbound, ListenerIdentity, RawMessage};
pub use stage::{Stage, StageFactory};
pub use stages::BaseStages;
