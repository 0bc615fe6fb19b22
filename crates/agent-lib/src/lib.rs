//! Metrics collection and threshold-alerting engine for the homeserver dashboard
//!
//! This crate provides the core functionality for:
//! - Periodic host metrics sampling
//! - Bounded, time-queryable snapshot history
//! - Threshold rule evaluation with per-rule cooldowns
//! - Health checks and observability

pub mod alerting;
pub mod collector;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;

pub use alerting::{
    AlertRule, Category, Condition, CooldownLedger, EvaluationEngine, GeneratedAlert, Operator,
    Severity,
};
pub use collector::{CollectionOutcome, CollectionScheduler, MetricsSampler, SysinfoSampler};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::HistoryStore;
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
