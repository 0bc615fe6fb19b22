//! Monitor configuration

use agent_lib::alerting::CategoryLabels;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "MONITOR_CONFIG";

/// Monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Host name reported in structured logs
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Port for health, metrics and history endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between two scheduled collections
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Number of snapshots retained in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// JSON file holding the alert rule set
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Locale of the category labels used in alert messages
    #[serde(default = "default_label_locale")]
    pub label_locale: String,

    /// Consecutive collection failures before the collector is unhealthy
    #[serde(default = "default_unhealthy_after")]
    pub unhealthy_after_failures: u32,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_collection_interval() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    agent_lib::history::DEFAULT_HISTORY_CAPACITY
}

fn default_label_locale() -> String {
    "ko".to_string()
}

fn default_unhealthy_after() -> u32 {
    5
}

impl MonitorConfig {
    /// Load from the file named by `MONITOR_CONFIG` (if set) and `MONITOR_*` variables
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Load from an optional file, with environment variables taking precedence
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn category_labels(&self) -> Result<CategoryLabels> {
        CategoryLabels::for_locale(&self.label_locale)
            .ok_or_else(|| anyhow!("Unsupported label locale: {}", self.label_locale))
    }
}
