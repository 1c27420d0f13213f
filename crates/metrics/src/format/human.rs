//! Human-readable metrics formatter
//!
//! One line per listener.
//!
//! # Example Output
//!
//! ```text
//! [metrics] gelf-udp: read 1.2K pkts, 45.3 MB (12.0 KB/s) | written 45.3 MB (12.0 KB/s)
//! [metrics] syslog-udp: read 10 pkts, 1.0 KB (0 B/s) | written 1.0 KB (0 B/s) | truncated 2
//! ```

use super::{MetricsFormatter, format_bytes, format_bytes_per_sec, format_count};
use crate::{
    CollectedListener, READ_BYTES, READ_BYTES_1SEC, READ_DISCARDED, READ_PACKETS,
    READ_TRUNCATED, WRITTEN_BYTES, WRITTEN_BYTES_1SEC,
};
use std::fmt::Write;

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        Self
    }

    fn format_listener(&self, listener: &CollectedListener) -> String {
        let s = &listener.snapshot;
        let mut output = format!(
            "[metrics] {}: read {} pkts, {} ({}) | written {} ({})",
            listener.id,
            format_count(s.get(READ_PACKETS)),
            format_bytes(s.get(READ_BYTES)),
            format_bytes_per_sec(s.get(READ_BYTES_1SEC)),
            format_bytes(s.get(WRITTEN_BYTES)),
            format_bytes_per_sec(s.get(WRITTEN_BYTES_1SEC)),
        );

        let truncated = s.get(READ_TRUNCATED);
        if truncated > 0 {
            let _ = write!(output, " | truncated {}", truncated);
        }

        let discarded = s.get(READ_DISCARDED);
        if discarded > 0 {
            let _ = write!(output, " | discarded {}", discarded);
        }

        output
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format_report(&self, listeners: &[CollectedListener]) -> String {
        if listeners.is_empty() {
            return "[metrics] no listeners".to_string();
        }

        listeners
            .iter()
            .map(|l| self.format_listener(l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
