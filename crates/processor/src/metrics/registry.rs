//! Shared Prometheus registry for rollup metrics

use parking_lot::RwLock;
use prometheus_client::registry::{Metric, Registry};
use std::sync::Arc;

use super::{MetricsError, Result};

/// Prefix of every metric name this crate registers
pub const METRIC_PREFIX: &str = "rollup";

/// Registry handle shared by the engine and whoever exports the metrics
///
/// Clones refer to the same registry, so metrics registered through one clone
/// show up when another clone encodes.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Registry::with_prefix(METRIC_PREFIX))),
        }
    }

    /// Register `metric` under `rollup_<name>`
    pub fn register(&self, name: &str, help: &str, metric: impl Metric) {
        self.inner.write().register(name, help, metric);
    }

    /// Render every registered metric in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let registry = self.inner.read();
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &registry)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
