//! Downstream consumer seam
//!
//! The handoff stage gives every decoded message to a `MessageConsumer`.
//! Consumers run on the reader task, so they must not block: queue full
//! means drop, as with any UDP input.

use crate::RawMessage;
use sluice_metrics::Counter;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Receives decoded messages from a listener
pub trait MessageConsumer: Send + Sync {
    fn consume(&self, message: RawMessage);
}

impl<F> MessageConsumer for F
where
    F: Fn(RawMessage) + Send + Sync,
{
    fn consume(&self, message: RawMessage) {
        self(message)
    }
}

/// Consumer backed by a bounded channel
///
/// Uses `try_send`; messages are dropped (and counted) when the channel is
/// full or the receiver is gone.
#[derive(Debug)]
pub struct ChannelConsumer {
    sender: mpsc::Sender<RawMessage>,
    sent: Counter,
    dropped: Counter,
}

impl ChannelConsumer {
    /// Create a consumer and the receiving end of its channel
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RawMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                sent: Counter::new(),
                dropped: Counter::new(),
            },
            receiver,
        )
    }

    /// Messages accepted by the channel
    pub fn sent(&self) -> u64 {
        self.sent.get()
    }

    /// Messages dropped because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }
}

impl MessageConsumer for ChannelConsumer {
    fn consume(&self, message: RawMessage) {
        match self.sender.try_send(message) {
            Ok(()) => self.sent.inc(),
            Err(TrySendError::Full(message)) => {
                // Queue full - drop the message (UDP semantics - best effort)
                self.dropped.inc();
                tracing::debug!(
                    listener_id = %message.listener_id,
                    message_id = %message.id,
                    "message dropped (queue full)"
                );
            }
            Err(TrySendError::Closed(message)) => {
                self.dropped.inc();
                tracing::debug!(
                    listener_id = %message.listener_id,
                    "message dropped (consumer closed)"
                );
            }
        }
    }
}

/// Consumer that discards everything, counting what it saw
#[derive(Debug, Default)]
pub struct NullConsumer {
    consumed: Counter,
}

impl NullConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.get()
    }
}

impl MessageConsumer for NullConsumer {
    fn consume(&self, _message: RawMessage) {
        self.consumed.inc();
    }
}
