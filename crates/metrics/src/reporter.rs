//! Periodic metrics reporter
//!
//! Collects snapshots from every registered listener at the configured
//! interval and writes the formatted report via tracing.

use crate::format::MetricsFormatter;
use crate::{HumanFormatter, JsonFormatter, ListenerMetricsProvider, MetricSnapshot, READ_PACKETS};
use sluice_config::{MetricsConfig, MetricsFormat};
use std::sync::Arc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Metrics collected from one listener
#[derive(Debug, Clone)]
pub struct CollectedListener {
    pub id: String,
    pub name: String,
    pub snapshot: MetricSnapshot,
}

/// Builder for constructing a MetricsReporter
#[derive(Default)]
pub struct MetricsReporterBuilder {
    config: Option<MetricsConfig>,
    listeners: Vec<Arc<dyn ListenerMetricsProvider>>,
}

impl MetricsReporterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metrics configuration
    pub fn config(mut self, config: MetricsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register a listener metrics provider
    pub fn listener(mut self, provider: Arc<dyn ListenerMetricsProvider>) -> Self {
        self.listeners.push(provider);
        self
    }

    /// Register multiple listener metrics providers
    pub fn listeners(mut self, providers: Vec<Arc<dyn ListenerMetricsProvider>>) -> Self {
        self.listeners.extend(providers);
        self
    }

    /// Build the MetricsReporter
    pub fn build(self) -> MetricsReporter {
        let config = self.config.unwrap_or_default();
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        MetricsReporter {
            config,
            formatter,
            listeners: self.listeners,
        }
    }
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    config: MetricsConfig,
    formatter: Box<dyn MetricsFormatter>,
    listeners: Vec<Arc<dyn ListenerMetricsProvider>>,
}

impl MetricsReporter {
    /// Create a new builder
    pub fn builder() -> MetricsReporterBuilder {
        MetricsReporterBuilder::new()
    }

    /// Run the reporter until cancellation
    ///
    /// Spawn this as a tokio task.
    pub async fn run(self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately and would report all zeros
        ticker.tick().await;

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            listeners = self.listeners.len(),
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    /// Collect and report metrics once
    fn report(&self) {
        let output = self.format();
        for line in output.lines() {
            info!("{}", line);
        }
    }

    fn format(&self) -> String {
        self.formatter.format_report(&self.collect())
    }

    /// Collect metrics from all registered providers
    ///
    /// With `skip_idle`, listeners that have read nothing are left out.
    fn collect(&self) -> Vec<CollectedListener> {
        self.listeners
            .iter()
            .map(|l| CollectedListener {
                id: l.listener_id().to_string(),
                name: l.listener_name().to_string(),
                snapshot: l.snapshot(),
            })
            .filter(|l| !self.config.skip_idle || l.snapshot.get(READ_PACKETS) > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{READ_BYTES, ThroughputCounter};
    use std::time::Duration;

    struct TestListener {
        id: String,
        counter: ThroughputCounter,
    }

    impl ListenerMetricsProvider for TestListener {
        fn listener_id(&self) -> &str {
            &self.id
        }
        fn listener_name(&self) -> &str {
            &self.id
        }
        fn snapshot(&self) -> MetricSnapshot {
            self.counter.snapshot()
        }
    }

    fn test_listener(id: &str, read: usize) -> Arc<dyn ListenerMetricsProvider> {
        let counter = ThroughputCounter::new();
        if read > 0 {
            counter.record_read(read);
        }
        Arc::new(TestListener {
            id: id.into(),
            counter,
        })
    }

    #[test]
    fn test_builder_default() {
        let reporter = MetricsReporter::builder().build();
        assert!(reporter.config.enabled);
        assert!(reporter.listeners.is_empty());
    }

    #[test]
    fn test_builder_with_listeners() {
        let reporter = MetricsReporter::builder()
            .listener(test_listener("a", 1))
            .listeners(vec![test_listener("b", 2), test_listener("c", 3)])
            .build();
        assert_eq!(reporter.listeners.len(), 3);
    }

    #[test]
    fn test_collect() {
        let reporter = MetricsReporter::builder()
            .listener(test_listener("gelf", 100))
            .build();

        let collected = reporter.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, "gelf");
        assert_eq!(collected[0].snapshot.get(READ_BYTES), 100);
    }

    #[test]
    fn test_skip_idle() {
        let listeners = vec![test_listener("busy", 10), test_listener("idle", 0)];

        let all = MetricsReporter::builder().listeners(listeners.clone()).build();
        assert_eq!(all.collect().len(), 2);

        let config = MetricsConfig {
            skip_idle: true,
            ..Default::default()
        };
        let busy = MetricsReporter::builder()
            .config(config)
            .listeners(listeners)
            .build();
        let collected = busy.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, "busy");
    }

    #[test]
    fn test_json_format_selected_from_config() {
        let config = MetricsConfig {
            format: MetricsFormat::Json,
            ..Default::default()
        };
        let reporter = MetricsReporter::builder()
            .config(config)
            .listener(test_listener("gelf", 100))
            .build();

        let parsed: serde_json::Value = serde_json::from_str(&reporter.format()).unwrap();
        assert_eq!(parsed["listeners"][0]["metrics"]["read.bytes"], 100);
    }

    #[tokio::test]
    async fn test_run_disabled() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };

        let reporter = MetricsReporter::builder().config(config).build();

        // Returns immediately when disabled
        reporter.run(CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn test_run_cancellation() {
        let config = MetricsConfig {
            enabled: true,
            interval: Duration::from_millis(100),
            ..Default::default()
        };

        let reporter = MetricsReporter::builder()
            .config(config)
            .listener(test_listener("gelf", 1))
            .build();
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            cancel_clone.cancel();
        });

        reporter.run(cancel).await;
    }
}
