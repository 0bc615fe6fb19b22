//! Threshold alerting over live host metrics
//!
//! This module provides:
//! - Declarative alert rules (category, metric, operator, threshold, cooldown)
//! - A cooldown ledger recording when each rule last fired
//! - The evaluation engine that turns a reading plus a rule set into alerts

mod engine;
mod ledger;
mod rule;

#[cfg(test)]
mod tests;

pub use engine::{
    extract_metric, format_message, AlertStatus, CategoryLabels, Evaluation, EvaluationEngine,
    GeneratedAlert, SkipReason,
};
pub use ledger::CooldownLedger;
pub use rule::{
    AlertRule, Category, Condition, Operator, RuleError, Severity, DEFAULT_COOLDOWN_SECS,
};
