//! Host metrics collection
//!
//! This module provides the sampler abstraction over the OS-level metric
//! readers, a sysinfo-backed implementation, and the scheduler that samples
//! on a fixed cadence and feeds the history store.

mod scheduler;
mod sysinfo_sampler;

#[cfg(test)]
mod tests;

pub use scheduler::{
    CollectionOutcome, CollectionScheduler, CollectionSchedulerBuilder, SchedulerConfig,
};
pub use sysinfo_sampler::SysinfoSampler;

use crate::models::MetricsReading;
use anyhow::Result;

pub use async_trait::async_trait;

/// Source of live host metrics
///
/// Implementations may block on I/O; the scheduler guarantees at most one
/// in-flight call per scheduler.
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Read current CPU, memory, disk and per-interface network counters
    async fn sample(&self) -> Result<MetricsReading>;
}
