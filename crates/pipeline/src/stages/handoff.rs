//! Handoff stage: gives messages to the consumer

use crate::{Inbound, ListenerIdentity, MessageConsumer, Stage};
use sluice_metrics::ThroughputCounter;
use std::sync::Arc;

/// Consumes every `RawMessage`, counting its bytes as written downstream;
/// anything else passes through
pub struct HandoffStage {
    listener_id: Arc<str>,
    consumer: Arc<dyn MessageConsumer>,
    counter: Arc<ThroughputCounter>,
}

impl HandoffStage {
    pub fn new(
        identity: &ListenerIdentity,
        consumer: Arc<dyn MessageConsumer>,
        counter: Arc<ThroughputCounter>,
    ) -> Self {
        Self {
            listener_id: identity.shared_id(),
            consumer,
            counter,
        }
    }
}

impl Stage for HandoffStage {
    fn handle(&self, item: Inbound) -> Option<Inbound> {
        match item {
            Inbound::Message(message) => {
                self.counter.record_written(message.payload.len());
                self.consumer.consume(message);
                None
            }
            other => {
                tracing::trace!(
                    listener_id = %self.listener_id,
                    "undecoded datagram reached handoff"
                );
                Some(other)
            }
        }
    }
}
