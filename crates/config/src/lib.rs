//! Configuration management for the review rollup

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use processor::config::{EngineConfig, StoreConfig};
use processor::window::{parse_instant, WindowBounds, WindowSchedule};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main rollup configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Merge engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Summary store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Raw event source
    #[serde(default)]
    pub source: SourceConfig,

    /// Batch windows to process
    #[serde(default)]
    pub windows: WindowsConfig,

    /// Observability settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl RollupConfig {
    /// Load configuration from defaults, an optional YAML file and the environment
    ///
    /// Environment variables are prefixed with `ROLLUP_` and use `__` between
    /// sections, e.g. `ROLLUP_ENGINE__COUNTER_MODE=averaging`.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(RollupConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("ROLLUP_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.store
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.windows.schedule()?;

        if self.observability.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "observability.log_level must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Raw event source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Newline-delimited JSON review feed
    pub events_path: Option<PathBuf>,
}

/// Batch window configuration
///
/// Either an explicit list of `START,END` windows or a tumbling split of a
/// range; explicit windows win when both are given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowsConfig {
    /// Explicit windows, e.g. `2018-02-01,2018-02-02`
    #[serde(default)]
    pub explicit: Vec<String>,

    /// Fixed-size windows covering a range
    pub tumbling: Option<TumblingWindows>,
}

/// Fixed-size windows covering `[from, to)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TumblingWindows {
    pub from: String,
    pub to: String,
    /// Window size in hours
    pub size_hours: u32,
}

impl WindowsConfig {
    /// Build the configured schedule; empty when nothing is configured
    pub fn schedule(&self) -> Result<WindowSchedule> {
        if !self.explicit.is_empty() {
            let windows = self
                .explicit
                .iter()
                .map(|spec| spec.parse::<WindowBounds>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            return WindowSchedule::from_windows(windows)
                .map_err(|e| ConfigError::ValidationError(e.to_string()));
        }

        match &self.tumbling {
            Some(tumbling) => tumbling.schedule(),
            None => Ok(WindowSchedule::default()),
        }
    }
}

impl TumblingWindows {
    pub fn schedule(&self) -> Result<WindowSchedule> {
        let from = parse_instant(&self.from).ok_or_else(|| {
            ConfigError::ValidationError(format!("windows.tumbling.from: bad instant '{}'", self.from))
        })?;
        let to = parse_instant(&self.to).ok_or_else(|| {
            ConfigError::ValidationError(format!("windows.tumbling.to: bad instant '{}'", self.to))
        })?;

        WindowSchedule::tumbling(from, to, Duration::hours(i64::from(self.size_hours)))
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,

    /// Enable structured JSON logging
    pub json_logging: bool,

    /// Print Prometheus metrics after a run
    pub print_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            print_metrics: false,
        }
    }
}
