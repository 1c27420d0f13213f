//! Items flowing through a pipeline

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Who owns a listener
///
/// Supplied by the owning input, passed to every stage factory and
/// stamped on every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerIdentity {
    id: Arc<str>,
    name: Arc<str>,
}

impl ListenerIdentity {
    pub fn new(id: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared id for stamping messages without copying
    #[inline]
    pub fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }
}

impl fmt::Display for ListenerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One datagram as read from the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Payload, never longer than the receive buffer size
    pub payload: Bytes,
    /// Sender
    pub remote: SocketAddr,
    /// Socket the datagram arrived on
    pub local: SocketAddr,
}

impl Datagram {
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A decoded datagram ready for the consumer
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: Uuid,
    pub payload: Bytes,
    pub remote: SocketAddr,
    pub listener_id: Arc<str>,
    pub received_at: DateTime<Utc>,
}

impl RawMessage {
    /// Wrap a datagram, assigning a fresh id and timestamp
    pub fn from_datagram(datagram: Datagram, listener_id: Arc<str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: datagram.payload,
            remote: datagram.remote,
            listener_id,
            received_at: Utc::now(),
        }
    }
}

/// What a stage receives and may pass on
#[derive(Debug, Clone)]
pub enum Inbound {
    Datagram(Datagram),
    Message(RawMessage),
}

impl Inbound {
    /// Payload length of either variant
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Datagram(d) => d.payload.len(),
            Self::Message(m) => m.payload.len(),
        }
    }
}

impl From<Datagram> for Inbound {
    fn from(d: Datagram) -> Self {
        Self::Datagram(d)
    }
}

impl From<RawMessage> for Inbound {
    fn from(m: RawMessage) -> Self {
        Self::Message(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram(payload: &'static [u8]) -> Datagram {
        Datagram {
            payload: Bytes::from_static(payload),
            remote: "127.0.0.1:5000".parse().unwrap(),
            local: "127.0.0.1:12201".parse().unwrap(),
        }
    }

    #[test]
    fn test_identity_display_is_id() {
        let identity = ListenerIdentity::new("gelf-udp", "GELF UDP");
        assert_eq!(identity.to_string(), "gelf-udp");
        assert_eq!(identity.name(), "GELF UDP");
    }

    #[test]
    fn test_message_from_datagram() {
        let before = Utc::now();
        let msg = RawMessage::from_datagram(datagram(b"hello"), Arc::from("gelf"));

        assert_eq!(&msg.payload[..], b"hello");
        assert_eq!(msg.remote.port(), 5000);
        assert_eq!(&*msg.listener_id, "gelf");
        assert!(msg.received_at >= before);
    }

    #[test]
    fn test_message_ids_unique() {
        let a = RawMessage::from_datagram(datagram(b"a"), Arc::from("gelf"));
        let b = RawMessage::from_datagram(datagram(b"a"), Arc::from("gelf"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_payload_len() {
        let d = datagram(b"1234");
        assert_eq!(Inbound::from(d.clone()).payload_len(), 4);

        let m = RawMessage::from_datagram(d, Arc::from("x"));
        assert_eq!(Inbound::from(m).payload_len(), 4);
    }
}
