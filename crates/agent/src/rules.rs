//! Alert rule source backed by a JSON file
//!
//! The file holds an array of rule documents. It is read fresh for every
//! evaluation so edits take effect without a restart. Entries that fail to
//! parse are logged and skipped; the remaining rules still load.

use agent_lib::alerting::AlertRule;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct RuleSource {
    path: Option<PathBuf>,
}

impl RuleSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current rule set; empty when no file is configured
    pub async fn load(&self) -> Result<Vec<AlertRule>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;

        parse_rules(&data).with_context(|| format!("Invalid rules file {}", path.display()))
    }
}

/// Parse a JSON array of rules, dropping entries that do not deserialize
pub fn parse_rules(data: &str) -> Result<Vec<AlertRule>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(data).context("Rules must be a JSON array")?;

    let rules = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            match serde_json::from_value::<AlertRule>(entry) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(
                        index,
                        rule_id = ?id,
                        error = %e,
                        "Skipping invalid alert rule"
                    );
                    None
                }
            }
        })
        .collect();

    Ok(rules)
}
