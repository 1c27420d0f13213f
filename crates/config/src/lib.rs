//! Sluice Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use sluice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[listeners]]\nid = \"gelf\"\nport = 12201").unwrap();
//! assert_eq!(config.listeners.len(), 1);
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [[listeners]]
//! id = "gelf-udp"
//! port = 12201
//! ```

mod error;
mod event_loop;
mod listeners;
mod logging;
mod metrics;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use event_loop::{BufferStrategy, EventLoopConfig, SelectorKind};
pub use listeners::{DEFAULT_RECV_BUFFER_SIZE, UdpListenerConfig};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use validation::MAX_RECV_BUFFER_SIZE;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Event-loop pool settings (shared by all listeners)
    pub event_loop: EventLoopConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// UDP listeners
    pub listeners: Vec<UdpListenerConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Enabled listeners in declaration order
    pub fn enabled_listeners(&self) -> impl Iterator<Item = &UdpListenerConfig> {
        self.listeners.iter().filter(|l| l.enabled)
    }

    /// Fail unless at least one listener is enabled
    ///
    /// Parsing accepts an empty listener list; serving does not.
    pub fn require_listeners(&self) -> Result<()> {
        if self.enabled_listeners().next().is_none() {
            return Err(ConfigError::NoListeners);
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert!(config.event_loop.worker_threads > 0);
        assert!(config.listeners.is_empty());
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_empty_config_has_no_listeners_to_serve() {
        let config = Config::from_str("").unwrap();
        assert!(matches!(
            config.require_listeners(),
            Err(ConfigError::NoListeners)
        ));
    }

    #[test]
    fn test_all_disabled_has_no_listeners_to_serve() {
        let config = Config::from_str("[[listeners]]\nid = \"a\"\nenabled = false").unwrap();
        assert!(config.require_listeners().is_err());
        assert_eq!(config.enabled_listeners().count(), 0);
    }

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[[listeners]]
id = "gelf-udp"
port = 12201
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].port, 12201);
        assert_eq!(config.listeners[0].recv_buffer_size, DEFAULT_RECV_BUFFER_SIZE);
        assert!(config.listeners[0].enabled);
        assert!(config.require_listeners().is_ok());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[event_loop]
worker_threads = 2
selector = "native"
buffer_strategy = "unpooled"

[metrics]
enabled = true
interval = "5s"
format = "json"

[[listeners]]
id = "gelf-udp"
name = "GELF UDP"
address = "127.0.0.1"
port = 12201
recv_buffer_size = 1048576
log_datagrams = true

[[listeners]]
id = "syslog-udp"
port = 514
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.event_loop.worker_threads, 2);
        assert_eq!(config.event_loop.selector, SelectorKind::Native);
        assert_eq!(config.event_loop.buffer_strategy, BufferStrategy::Unpooled);
        assert_eq!(config.metrics.format, MetricsFormat::Json);
        assert_eq!(config.listeners.len(), 2);

        let gelf = &config.listeners[0];
        assert_eq!(gelf.display_name(), "GELF UDP");
        assert_eq!(gelf.recv_buffer_size, 1048576);
        assert!(gelf.log_datagrams);

        let names: Vec<_> = config.enabled_listeners().map(|l| l.id.as_str()).collect();
        assert_eq!(names, vec!["gelf-udp", "syslog-udp"]);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[listeners]]\nid = \"gelf\"\nport = 12201").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listeners[0].id, "gelf");
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/sluice.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("/nonexistent/sluice.toml"));
    }
}
