//! Threshold evaluation against a live reading
//!
//! For each enabled rule the engine resolves the targeted metric from the
//! reading, applies the comparison and, if it holds, fires unless the rule
//! is still inside its cooldown window.

use super::{AlertRule, Category, CooldownLedger, Severity};
use crate::models::{now_millis, MetricsReading};
use crate::observability::{EngineMetrics, StructuredLogger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Display labels per category, used when formatting alert messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLabels {
    pub cpu: String,
    pub memory: String,
    pub disk: String,
    pub network: String,
    pub container: String,
}

impl CategoryLabels {
    /// Labels of the reference dashboard locale
    pub fn korean() -> Self {
        Self {
            cpu: "CPU".to_string(),
            memory: "메모리".to_string(),
            disk: "디스크".to_string(),
            network: "네트워크".to_string(),
            container: "컨테이너".to_string(),
        }
    }

    pub fn english() -> Self {
        Self {
            cpu: "CPU".to_string(),
            memory: "Memory".to_string(),
            disk: "Disk".to_string(),
            network: "Network".to_string(),
            container: "Container".to_string(),
        }
    }

    /// Look up a table by locale code, `None` for unsupported locales
    pub fn for_locale(locale: &str) -> Option<Self> {
        match locale {
            "ko" => Some(Self::korean()),
            "en" => Some(Self::english()),
            _ => None,
        }
    }

    pub fn label(&self, category: Category) -> &str {
        match category {
            Category::Cpu => &self.cpu,
            Category::Memory => &self.memory,
            Category::Disk => &self.disk,
            Category::Network => &self.network,
            Category::Container => &self.container,
        }
    }
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self::korean()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
}

/// Alert produced by a firing rule; persistence and delivery belong to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAlert {
    pub rule_id: String,
    pub rule_name: String,
    pub category: Category,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub triggered_at: i64,
}

/// Why a rule did not fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    /// The (category, metric) pair has no value in the base reading
    UnresolvedMetric,
    InvalidThreshold,
    ConditionNotMet,
    CoolingDown,
}

/// Outcome of evaluating a single rule
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Fired(GeneratedAlert),
    Skipped { rule_id: String, reason: SkipReason },
}

impl Evaluation {
    fn skipped(rule: &AlertRule, reason: SkipReason) -> Self {
        Evaluation::Skipped {
            rule_id: rule.id.clone(),
            reason,
        }
    }

    pub fn into_alert(self) -> Option<GeneratedAlert> {
        match self {
            Evaluation::Fired(alert) => Some(alert),
            Evaluation::Skipped { .. } => None,
        }
    }
}

/// Resolve the value a rule targets, `None` when the pair is not known
pub fn extract_metric(reading: &MetricsReading, category: Category, metric: &str) -> Option<f64> {
    match (category, metric) {
        (Category::Cpu, "usage") => Some(reading.cpu.usage),
        (Category::Memory, "usage") => Some(reading.memory.usage),
        (Category::Disk, "usage") => Some(reading.disk.usage),
        (Category::Network, "rxBytes") => Some(reading.network_totals().0 as f64),
        (Category::Network, "txBytes") => Some(reading.network_totals().1 as f64),
        // Container counts come from a separate source
        (Category::Container, _) => None,
        _ => None,
    }
}

/// Render the human-readable alert text, e.g. `CPU usage: 85.0% (threshold: > 80%)`
pub fn format_message(labels: &CategoryLabels, rule: &AlertRule, value: f64) -> String {
    format!(
        "{} {}: {:.1}% (threshold: {} {}%)",
        labels.label(rule.category),
        rule.condition.metric,
        value,
        rule.condition.operator,
        rule.condition.threshold
    )
}

/// Evaluates rule sets against live readings, tracking cooldowns across calls
#[derive(Debug)]
pub struct EvaluationEngine {
    ledger: Arc<CooldownLedger>,
    labels: CategoryLabels,
    metrics: EngineMetrics,
    logger: Option<StructuredLogger>,
}

impl EvaluationEngine {
    pub fn new(ledger: Arc<CooldownLedger>) -> Self {
        Self {
            ledger,
            labels: CategoryLabels::default(),
            metrics: EngineMetrics::new(),
            logger: None,
        }
    }

    pub fn with_labels(mut self, labels: CategoryLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn ledger(&self) -> &Arc<CooldownLedger> {
        &self.ledger
    }

    pub fn labels(&self) -> &CategoryLabels {
        &self.labels
    }

    /// Evaluate `rules` in order and return the alerts that fired
    pub fn evaluate_metrics(
        &self,
        reading: &MetricsReading,
        rules: &[AlertRule],
    ) -> Vec<GeneratedAlert> {
        self.evaluate_metrics_at(reading, rules, now_millis())
    }

    pub fn evaluate_metrics_at(
        &self,
        reading: &MetricsReading,
        rules: &[AlertRule],
        now: i64,
    ) -> Vec<GeneratedAlert> {
        let alerts: Vec<GeneratedAlert> = rules
            .iter()
            .filter_map(|rule| self.evaluate_rule(reading, rule, now).into_alert())
            .collect();

        debug!(
            rules = rules.len(),
            fired = alerts.len(),
            "Evaluated alert rules"
        );

        alerts
    }

    /// Evaluate one rule, recording the firing time when it fires
    pub fn evaluate_rule(&self, reading: &MetricsReading, rule: &AlertRule, now: i64) -> Evaluation {
        if !rule.enabled {
            return Evaluation::skipped(rule, SkipReason::Disabled);
        }

        self.metrics.inc_rules_evaluated();

        let Some(value) = extract_metric(reading, rule.category, &rule.condition.metric) else {
            debug!(
                rule_id = %rule.id,
                category = %rule.category,
                metric = %rule.condition.metric,
                "Skipping rule with unresolved metric"
            );
            return Evaluation::skipped(rule, SkipReason::UnresolvedMetric);
        };

        let threshold = rule.condition.threshold;
        if !threshold.is_finite() {
            debug!(rule_id = %rule.id, "Skipping rule with non-finite threshold");
            return Evaluation::skipped(rule, SkipReason::InvalidThreshold);
        }

        if !rule.condition.operator.check(value, threshold) {
            return Evaluation::skipped(rule, SkipReason::ConditionNotMet);
        }

        if !self.ledger.try_fire(&rule.id, rule.cooldown_millis(), now) {
            self.metrics.inc_alerts_suppressed();
            debug!(rule_id = %rule.id, "Alert suppressed (cooldown)");
            return Evaluation::skipped(rule, SkipReason::CoolingDown);
        }

        let alert = GeneratedAlert {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            category: rule.category,
            severity: rule.severity,
            status: AlertStatus::Active,
            message: format_message(&self.labels, rule, value),
            value,
            threshold,
            triggered_at: now,
        };

        self.metrics.inc_alerts_fired();
        if let Some(logger) = &self.logger {
            logger.log_alert_fired(&alert);
        }

        Evaluation::Fired(alert)
    }

    /// Clear every cooldown so all rules may fire on the next evaluation
    pub fn reset_cooldowns(&self) {
        self.ledger.reset();
    }

    /// Clear the cooldown of a single rule; returns whether it had an entry
    pub fn reset_rule_cooldown(&self, rule_id: &str) -> bool {
        self.ledger.reset_rule(rule_id)
    }
}
