//! UDP listener configuration
//!
//! One `[[listeners]]` entry per UDP input. Each entry becomes one
//! listener instance with its own metric set.

use crate::LogLevel;
use serde::Deserialize;

/// Default receive buffer size (256KB)
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 256 * 1024;

/// UDP listener configuration
///
/// # Example
///
/// ```toml
/// [[listeners]]
/// id = "gelf-udp"
/// name = "GELF UDP"
/// address = "0.0.0.0"
/// port = 12201
/// recv_buffer_size = 262144
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UdpListenerConfig {
    /// Whether this listener is enabled
    /// Default: true (enabled when config is present)
    pub enabled: bool,

    /// Unique listener id (used in logs, metrics and messages)
    pub id: String,

    /// Display name
    /// Default: same as id
    pub name: Option<String>,

    /// Bind address, empty means all interfaces
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port, 0 lets the OS pick one
    /// Default: 0
    pub port: u16,

    /// Socket receive buffer and maximum datagram payload (bytes)
    /// Default: 262144 (256KB)
    pub recv_buffer_size: usize,

    /// Log every received datagram
    /// Default: false
    pub log_datagrams: bool,

    /// Level for datagram logging
    /// Default: info
    pub datagram_log_level: LogLevel,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id: "udp".into(),
            name: None,
            address: "0.0.0.0".into(),
            port: 0,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            log_datagrams: false,
            datagram_log_level: LogLevel::Info,
        }
    }
}

impl UdpListenerConfig {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Bind address with the empty string mapped to all interfaces
    pub fn effective_address(&self) -> &str {
        if self.address.trim().is_empty() {
            "0.0.0.0"
        } else {
            self.address.trim()
        }
    }
}
