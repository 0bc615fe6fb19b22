//! Observability infrastructure for the metrics engine
//!
//! Provides:
//! - Prometheus metrics (collection latency, collection outcomes, history size, alert counts)
//! - Structured JSON logging with tracing

use crate::alerting::{GeneratedAlert, Severity};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for collection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    collection_latency_seconds: Histogram,
    collections_total: IntCounter,
    collection_errors_total: IntCounter,
    collections_skipped_total: IntCounter,
    history_snapshots: IntGauge,
    rules_evaluated_total: IntCounter,
    alerts_fired_total: IntCounter,
    alerts_suppressed_total: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram!(
                "homeserver_monitor_collection_latency_seconds",
                "Time spent sampling host metrics",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            collections_total: register_int_counter!(
                "homeserver_monitor_collections_total",
                "Snapshots successfully collected and stored"
            )
            .expect("Failed to register collections_total"),

            collection_errors_total: register_int_counter!(
                "homeserver_monitor_collection_errors_total",
                "Collections that failed because the sampler returned an error"
            )
            .expect("Failed to register collection_errors_total"),

            collections_skipped_total: register_int_counter!(
                "homeserver_monitor_collections_skipped_total",
                "Collections dropped because another one was in flight"
            )
            .expect("Failed to register collections_skipped_total"),

            history_snapshots: register_int_gauge!(
                "homeserver_monitor_history_snapshots",
                "Number of snapshots currently retained in history"
            )
            .expect("Failed to register history_snapshots"),

            rules_evaluated_total: register_int_counter!(
                "homeserver_monitor_rules_evaluated_total",
                "Alert rules evaluated against a live reading"
            )
            .expect("Failed to register rules_evaluated_total"),

            alerts_fired_total: register_int_counter!(
                "homeserver_monitor_alerts_fired_total",
                "Alerts generated by threshold rules"
            )
            .expect("Failed to register alerts_fired_total"),

            alerts_suppressed_total: register_int_counter!(
                "homeserver_monitor_alerts_suppressed_total",
                "Matching rules suppressed by their cooldown"
            )
            .expect("Failed to register alerts_suppressed_total"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics").finish_non_exhaustive()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (registers global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner().collection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_collections(&self) {
        self.inner().collections_total.inc();
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors_total.inc();
    }

    pub fn inc_collections_skipped(&self) {
        self.inner().collections_skipped_total.inc();
    }

    pub fn set_history_size(&self, snapshots: usize) {
        self.inner().history_snapshots.set(snapshots as i64);
    }

    pub fn inc_rules_evaluated(&self) {
        self.inner().rules_evaluated_total.inc();
    }

    pub fn inc_alerts_fired(&self) {
        self.inner().alerts_fired_total.inc();
    }

    pub fn inc_alerts_suppressed(&self) {
        self.inner().alerts_suppressed_total.inc();
    }
}

/// Structured logger for engine events
///
/// Provides consistent JSON-formatted logging for collection failures,
/// fired alerts, and lifecycle events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Log a fired threshold alert
    pub fn log_alert_fired(&self, alert: &GeneratedAlert) {
        match alert.severity {
            Severity::Critical => {
                warn!(
                    event = "alert_fired",
                    host = %self.host_name,
                    rule_id = %alert.rule_id,
                    rule_name = %alert.rule_name,
                    category = %alert.category,
                    severity = %alert.severity,
                    value = alert.value,
                    threshold = alert.threshold,
                    "{}",
                    alert.message
                );
            }
            _ => {
                info!(
                    event = "alert_fired",
                    host = %self.host_name,
                    rule_id = %alert.rule_id,
                    rule_name = %alert.rule_name,
                    category = %alert.category,
                    severity = %alert.severity,
                    value = alert.value,
                    threshold = alert.threshold,
                    "{}",
                    alert.message
                );
            }
        }
    }

    /// Log a sampling failure; the scheduler keeps running
    pub fn log_collection_failed(&self, error: &anyhow::Error) {
        warn!(
            event = "collection_failed",
            host = %self.host_name,
            error = %format!("{:#}", error),
            "Metrics collection failed, retrying on next tick"
        );
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64, history_capacity: usize) {
        info!(
            event = "monitor_started",
            host = %self.host_name,
            version = %version,
            interval_secs = interval_secs,
            history_capacity = history_capacity,
            "Homeserver monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Homeserver monitor shutting down"
        );
    }
}
