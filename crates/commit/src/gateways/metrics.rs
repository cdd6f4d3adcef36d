//! Counter sink passed into the coordinator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::lock;

pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str);
}

/// Forwards counters to the globally installed `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct RecorderMetrics;

impl MetricsSink for RecorderMetrics {
    fn increment(&self, name: &str) {
        metrics::counter!(name.to_owned()).increment(1);
    }
}

/// Counts increments in memory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetrics {
    counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> u64 {
        lock(&self.counts).get(name).copied().unwrap_or(0)
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &str) {
        *lock(&self.counts).entry(name.to_string()).or_default() += 1;
    }
}
