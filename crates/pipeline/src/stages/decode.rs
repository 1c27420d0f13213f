//! Decode stage: datagram to `RawMessage`

use crate::{Inbound, ListenerIdentity, RawMessage, Stage};
use std::sync::Arc;

/// Wraps each datagram in a `RawMessage` stamped with the listener id
pub struct DecodeStage {
    listener_id: Arc<str>,
}

impl DecodeStage {
    pub fn new(identity: &ListenerIdentity) -> Self {
        Self {
            listener_id: identity.shared_id(),
        }
    }
}

impl Stage for DecodeStage {
    fn handle(&self, item: Inbound) -> Option<Inbound> {
        match item {
            Inbound::Datagram(d) => Some(Inbound::Message(RawMessage::from_datagram(
                d,
                Arc::clone(&self.listener_id),
            ))),
            message @ Inbound::Message(_) => Some(message),
        }
    }
}
