//! Stage and stage factory traits
//!
//! # Design
//!
//! - Stages are synchronous and must not block; they run on the reader
//!   task of the socket that produced the datagram
//! - Returning `None` consumes the item, nothing further runs
//! - Factories are shared; each bound socket asks for its own instances

use crate::{Inbound, ListenerIdentity};

/// One step of the inbound path
pub trait Stage: Send {
    /// Process an item, returning what the next stage should see
    fn handle(&self, item: Inbound) -> Option<Inbound>;
}

/// Creates stage instances for a listener
pub trait StageFactory: Send + Sync {
    fn create(&self, identity: &ListenerIdentity) -> Box<dyn Stage>;
}

impl<F> StageFactory for F
where
    F: Fn(&ListenerIdentity) -> Box<dyn Stage> + Send + Sync,
{
    fn create(&self, identity: &ListenerIdentity) -> Box<dyn Stage> {
        self(identity)
    }
}

impl<F> Stage for F
where
    F: Fn(Inbound) -> Option<Inbound> + Send,
{
    fn handle(&self, item: Inbound) -> Option<Inbound> {
        self(item)
    }
}
