//! JSON metrics formatter
//!
//! Formats metrics as structured JSON for machine parsing.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "type": "listeners",
//!   "listeners": [
//!     { "id": "gelf-udp", "name": "GELF UDP", "metrics": { "read.bytes": 2048, ... } }
//!   ]
//! }
//! ```

use super::MetricsFormatter;
use crate::{CollectedListener, MetricSnapshot};
use serde::Serialize;

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    listeners: Vec<ListenerJson<'a>>,
}

#[derive(Serialize)]
struct ListenerJson<'a> {
    id: &'a str,
    name: &'a str,
    metrics: &'a MetricSnapshot,
}

impl MetricsFormatter for JsonFormatter {
    fn format_report(&self, listeners: &[CollectedListener]) -> String {
        let json = ReportJson {
            report_type: "listeners",
            listeners: listeners
                .iter()
                .map(|l| ListenerJson {
                    id: &l.id,
                    name: &l.name,
                    metrics: &l.snapshot,
                })
                .collect(),
        };

        // Compact JSON (no pretty printing for log lines)
        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{READ_BYTES, READ_PACKETS};

    #[test]
    fn test_format_report() {
        let formatter = JsonFormatter::new();
        let listeners = vec![CollectedListener {
            id: "gelf-udp".into(),
            name: "GELF UDP".into(),
            snapshot: [(READ_BYTES.to_string(), 2048), (READ_PACKETS.to_string(), 2)]
                .into_iter()
                .collect(),
        }];

        let output = formatter.format_report(&listeners);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["type"], "listeners");
        assert_eq!(parsed["listeners"][0]["id"], "gelf-udp");
        assert_eq!(parsed["listeners"][0]["name"], "GELF UDP");
        assert_eq!(parsed["listeners"][0]["metrics"]["read.bytes"], 2048);
        assert_eq!(parsed["listeners"][0]["metrics"]["read.packets"], 2);
    }

    #[test]
    fn test_single_line() {
        let formatter = JsonFormatter::new();
        let output = formatter.format_report(&[]);
        assert!(!output.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["listeners"].as_array().unwrap().len(), 0);
    }
}
