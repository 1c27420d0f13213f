//! `[metrics]` section
//!
//! The periodic per-listener throughput report written to the log.

use serde::Deserialize;
use std::time::Duration;

/// Report rendering
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// One aligned line per listener
    #[default]
    Human,
    /// One JSON document per report
    Json,
}

/// Throughput report settings
///
/// ```toml
/// [metrics]
/// interval = "30s"
/// format = "json"
/// skip_idle = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Default: true
    pub enabled: bool,

    /// Time between reports, at least one second since the rate gauges
    /// cover one second
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Default: human
    pub format: MetricsFormat,

    /// Leave out listeners that have not read a datagram yet
    /// Default: false
    pub skip_idle: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(10),
            format: MetricsFormat::Human,
            skip_idle: false,
        }
    }
}
