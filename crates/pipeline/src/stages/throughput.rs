//! Throughput accounting stage

use crate::{Inbound, Stage};
use sluice_metrics::ThroughputCounter;
use std::sync::Arc;

/// Records bytes and packets read, before any transformation
pub struct ThroughputStage {
    counter: Arc<ThroughputCounter>,
}

impl ThroughputStage {
    pub fn new(counter: Arc<ThroughputCounter>) -> Self {
        Self { counter }
    }
}

impl Stage for ThroughputStage {
    #[inline]
    fn handle(&self, item: Inbound) -> Option<Inbound> {
        if let Inbound::Datagram(ref d) = item {
            self.counter.record_read(d.payload.len());
        }
        Some(item)
    }
}
