//! Configuration validation
//!
//! Validates config consistency:
//! - Listener ids are unique
//! - No two enabled listeners bind the same fixed address and port
//! - Receive buffer sizes fit the socket option range
//! - Event loop and metrics settings are usable

use crate::Config;
use crate::error::{ConfigError, Result};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Largest receive buffer the socket layer accepts (SO_RCVBUF is a C int)
pub const MAX_RECV_BUFFER_SIZE: usize = i32::MAX as usize;

/// Shortest accepted metrics reporting interval
const MIN_METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_event_loop(config)?;
    validate_metrics(config)?;
    validate_listeners(config)?;
    Ok(())
}

fn validate_event_loop(config: &Config) -> Result<()> {
    if config.event_loop.worker_threads == 0 {
        return Err(ConfigError::invalid_value(
            "event_loop",
            "event_loop",
            "worker_threads",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.enabled && config.metrics.interval < MIN_METRICS_INTERVAL {
        return Err(ConfigError::invalid_value(
            "metrics",
            "metrics",
            "interval",
            "must be at least 1s",
        ));
    }
    Ok(())
}

/// Validate listener configurations
fn validate_listeners(config: &Config) -> Result<()> {
    let mut ids = HashSet::new();
    let mut ports: HashMap<(String, u16), Vec<&str>> = HashMap::new();

    for listener in &config.listeners {
        if listener.id.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "listener",
                "",
                "id",
                "must not be empty",
            ));
        }

        if !ids.insert(listener.id.as_str()) {
            return Err(ConfigError::duplicate_listener(&listener.id));
        }

        if listener.recv_buffer_size == 0 {
            return Err(ConfigError::invalid_value(
                "listener",
                &listener.id,
                "recv_buffer_size",
                "must be greater than zero",
            ));
        }

        if listener.recv_buffer_size > MAX_RECV_BUFFER_SIZE {
            return Err(ConfigError::invalid_value(
                "listener",
                &listener.id,
                "recv_buffer_size",
                format!("must not exceed {}", MAX_RECV_BUFFER_SIZE),
            ));
        }

        // Port 0 is assigned by the OS and never conflicts
        if listener.enabled && listener.port != 0 {
            ports
                .entry((listener.effective_address().to_string(), listener.port))
                .or_default()
                .push(&listener.id);
        }
    }

    let mut conflicts: Vec<_> = ports.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
    conflicts.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(((address, port), ids)) = conflicts.into_iter().next() {
        return Err(ConfigError::duplicate_port(port, address, ids.join(", ")));
    }

    Ok(())
}
