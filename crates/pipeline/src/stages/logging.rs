//! Per-datagram logging stage
//!
//! Observability only: every item passes through untouched.

use crate::{Inbound, ListenerIdentity, Stage};
use std::sync::Arc;
use tracing::Level;

/// Logs each item at a fixed level
pub struct LoggingStage {
    listener_id: Arc<str>,
    level: Level,
}

impl LoggingStage {
    pub fn new(identity: &ListenerIdentity, level: Level) -> Self {
        Self {
            listener_id: identity.shared_id(),
            level,
        }
    }

    fn log(&self, item: &Inbound) {
        let (kind, remote, len) = match item {
            Inbound::Datagram(d) => ("datagram", d.remote, d.payload.len()),
            Inbound::Message(m) => ("message", m.remote, m.payload.len()),
        };

        // Event levels must be constants
        let id = &self.listener_id;
        if self.level == Level::TRACE {
            tracing::trace!(listener_id = %id, %remote, len, kind, "received");
        } else if self.level == Level::DEBUG {
            tracing::debug!(listener_id = %id, %remote, len, kind, "received");
        } else if self.level == Level::INFO {
            tracing::info!(listener_id = %id, %remote, len, kind, "received");
        } else if self.level == Level::WARN {
            tracing::warn!(listener_id = %id, %remote, len, kind, "received");
        } else {
            tracing::error!(listener_id = %id, %remote, len, kind, "received");
        }
    }
}

impl Stage for LoggingStage {
    fn handle(&self, item: Inbound) -> Option<Inbound> {
        self.log(&item);
        Some(item)
    }
}
