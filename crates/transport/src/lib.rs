//! Sluice - Transport
//!
//! UDP listeners on a shared event-loop pool.
//!
//! # Components
//!
//! - **Event loop** - process-wide worker threads; listeners get a handle
//! - **Receive buffer** - one configured size drives `SO_RCVBUF` and the
//!   fixed read size, with platform-specific oversize handling
//! - **UDP listener** - binds sockets, runs readers, feeds each datagram
//!   through the listener's pipeline
//!
//! # Example
//!
//! ```ignore
//! use sluice_config::EventLoopConfig;
//! use sluice_pipeline::{ListenerIdentity, NullConsumer};
//! use sluice_transport::{EventLoopPool, ListenerConfig, UdpListener};
//! use std::sync::Arc;
//!
//! let pool = EventLoopPool::new(&EventLoopConfig::default())?;
//! let listener = UdpListener::new(
//!     ListenerConfig { port: 12201, ..Default::default() },
//!     pool.handle(),
//!     Arc::new(NullConsumer::new()),
//! )?;
//! listener.launch(ListenerIdentity::new("gelf-udp", "GELF UDP"))?;
//! ```

mod error;
pub mod event_loop;
mod port_claim;
mod reader;
pub mod recv_buffer;
pub mod udp;

pub use error::{EventLoopError, ListenerError, ListenerState};
pub use event_loop::{EventLoopHandle, EventLoopPool, Selector};
pub use recv_buffer::{
    BootstrapOptions, FixedRecvAllocator, FixedRecvHandle, OversizeBehavior, ReadOutcome,
    RecvBufferPolicy,
};
pub use udp::{ListenerConfig, ListenerMetricsHandle, UdpListener, UdpListenerBuilder};
