//! Log settings
//!
//! `[log]` sets the process-wide subscriber. `LogLevel` is also the type of
//! each listener's `datagram_log_level`.

use serde::Deserialize;

/// Crates whose verbose output `debug` and `trace` turn on
const SLUICE_TARGETS: [&str; 5] = [
    "sluice",
    "sluice_config",
    "sluice_metrics",
    "sluice_pipeline",
    "sluice_transport",
];

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `EnvFilter` directive for this level
    ///
    /// `debug` and `trace` apply to sluice's own crates only; the runtime and
    /// socket libraries stay at `info` so per-datagram logs remain readable.
    pub fn directive(&self) -> String {
        match self {
            Self::Trace | Self::Debug => {
                let mut directive = String::from("info");
                for target in SLUICE_TARGETS {
                    directive.push(',');
                    directive.push_str(target);
                    directive.push('=');
                    directive.push_str(self.as_str());
                }
                directive
            }
            _ => self.as_str().to_string(),
        }
    }
}

/// Subscriber output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event, for log shippers
    Json,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"   # sluice crates only
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default: info
    pub level: LogLevel,
    /// Default: console
    pub format: LogFormat,
}
