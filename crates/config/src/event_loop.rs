//! Event-loop pool configuration
//!
//! Process-wide I/O settings shared by every listener. These are handed to
//! the pool once at startup, never per listener.

use serde::Deserialize;

/// Socket readiness strategy
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    /// Pick `native` where the platform supports it, else `portable`
    Auto,
    /// One socket per listener, works everywhere (default)
    #[default]
    Portable,
    /// Kernel load-balanced socket per worker (SO_REUSEPORT, Linux)
    Native,
}

/// How read buffers are obtained
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BufferStrategy {
    /// Reuse one arena per reader (default)
    #[default]
    Pooled,
    /// Allocate a fresh buffer for every datagram
    Unpooled,
}

/// Event-loop pool configuration
///
/// # Example
///
/// ```toml
/// [event_loop]
/// worker_threads = 4
/// selector = "native"
/// buffer_strategy = "pooled"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Number of I/O worker threads
    /// Default: number of CPU cores
    pub worker_threads: usize,

    /// Selector implementation (portable, auto, native)
    /// Default: portable
    pub selector: SelectorKind,

    /// Read buffer strategy (pooled, unpooled)
    /// Default: pooled
    pub buffer_strategy: BufferStrategy,

    /// Seconds to wait for in-flight work when the pool shuts down
    /// Default: 5
    pub shutdown_timeout_secs: u64,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus(),
            selector: SelectorKind::Portable,
            buffer_strategy: BufferStrategy::Pooled,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Get the number of available CPUs, defaulting to 4 if detection fails
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EventLoopConfig::default();
        assert!(config.worker_threads > 0);
        assert_eq!(config.selector, SelectorKind::Portable);
        assert_eq!(config.buffer_strategy, BufferStrategy::Pooled);
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
worker_threads = 2
selector = "portable"
buffer_strategy = "unpooled"
shutdown_timeout_secs = 1
"#;
        let config: EventLoopConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.selector, SelectorKind::Portable);
        assert_eq!(config.buffer_strategy, BufferStrategy::Unpooled);
        assert_eq!(config.shutdown_timeout_secs, 1);
    }

    #[test]
    fn test_selector_variants() {
        for (s, expected) in [
            ("auto", SelectorKind::Auto),
            ("portable", SelectorKind::Portable),
            ("native", SelectorKind::Native),
        ] {
            let config: EventLoopConfig =
                toml::from_str(&format!("selector = \"{}\"", s)).unwrap();
            assert_eq!(config.selector, expected);
        }
    }
}
