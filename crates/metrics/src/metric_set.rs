//! Named metric registry
//!
//! A `MetricSet` belongs to exactly one listener. Names are dotted strings
//! (`read.bytes`). The owner of the counters registers them once and keeps
//! its own `Arc`s for updates; readers of the set only take a read lock.

use crate::{Counter, Gauge};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered metric
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
}

impl Metric {
    /// Current value
    pub fn value(&self) -> u64 {
        match self {
            Self::Counter(c) => c.get(),
            Self::Gauge(g) => g.get(),
        }
    }
}

/// Registry of named metrics scoped to one listener
#[derive(Debug, Default)]
pub struct MetricSet {
    metrics: RwLock<BTreeMap<String, Metric>>,
}

impl MetricSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a metric under `name`
    pub(crate) fn insert(&self, name: &str, metric: Metric) {
        self.metrics.write().insert(name.to_string(), metric);
    }

    /// Look up a metric by name
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    /// Current value of a metric, if registered
    pub fn value(&self, name: &str) -> Option<u64> {
        self.metrics.read().get(name).map(Metric::value)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Point-in-time copy of every value
    pub fn snapshot(&self) -> MetricSnapshot {
        let values = self
            .metrics
            .read()
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value()))
            .collect();
        MetricSnapshot { values }
    }
}

/// Point-in-time values of a metric set, keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricSnapshot {
    values: BTreeMap<String, u64>,
}

impl MetricSnapshot {
    /// Value for `name`, zero when absent
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, u64)> for MetricSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
