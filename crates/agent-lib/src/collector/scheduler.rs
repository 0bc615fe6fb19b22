//! Periodic metrics collection
//!
//! Samples the host on a fixed interval and appends one snapshot per
//! successful sample to the history store. At most one collection is in
//! flight at any time: a tick or manual request that arrives while another
//! collection is running is dropped, not queued.

use super::MetricsSampler;
use crate::health::{components, HealthRegistry};
use crate::history::HistoryStore;
use crate::models::{now_millis, Snapshot};
use crate::observability::{EngineMetrics, StructuredLogger};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default collection interval
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(60);

/// Consecutive failures before the collector is reported unhealthy
pub const DEFAULT_UNHEALTHY_AFTER: u32 = 5;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two scheduled collections (default: 60 seconds)
    pub interval: Duration,
    /// Consecutive failures before the collector turns unhealthy (default: 5)
    pub unhealthy_after: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_COLLECTION_INTERVAL,
            unhealthy_after: DEFAULT_UNHEALTHY_AFTER,
        }
    }
}

/// Result of a single collection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionOutcome {
    /// A snapshot was appended to history
    Stored,
    /// The sampler returned an error; nothing was appended
    Failed,
    /// Another collection was already in flight
    Skipped,
}

/// Clears the in-flight flag when dropped, including on panic
struct CollectingGuard<'a>(&'a AtomicBool);

impl<'a> CollectingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CollectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State shared between the scheduler handle and its background task
struct Collector {
    sampler: Arc<dyn MetricsSampler>,
    store: Arc<HistoryStore>,
    collecting: AtomicBool,
    unhealthy_after: u32,
    metrics: EngineMetrics,
    logger: Option<StructuredLogger>,
    health: Option<HealthRegistry>,
}

impl Collector {
    async fn collect_and_store(&self) -> CollectionOutcome {
        let Some(_guard) = CollectingGuard::acquire(&self.collecting) else {
            debug!("Collection already in flight, skipping");
            self.metrics.inc_collections_skipped();
            return CollectionOutcome::Skipped;
        };

        let start = Instant::now();
        let result = self.sampler.sample().await;
        self.metrics
            .observe_collection_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(reading) => {
                let snapshot = Snapshot::from_reading(&reading, now_millis());
                self.store.add_snapshot(snapshot);

                self.metrics.inc_collections();
                self.metrics.set_history_size(self.store.get_size());
                if let Some(health) = &self.health {
                    health.record_success(components::COLLECTOR).await;
                }

                debug!(
                    timestamp = snapshot.timestamp,
                    cpu = snapshot.cpu,
                    memory = snapshot.memory,
                    disk = snapshot.disk,
                    "Snapshot stored"
                );
                CollectionOutcome::Stored
            }
            Err(e) => {
                self.metrics.inc_collection_errors();
                match &self.logger {
                    Some(logger) => logger.log_collection_failed(&e),
                    None => warn!(error = %format!("{:#}", e), "Metrics collection failed"),
                }
                if let Some(health) = &self.health {
                    health
                        .record_failure(
                            components::COLLECTOR,
                            format!("{:#}", e),
                            self.unhealthy_after,
                        )
                        .await;
                }
                CollectionOutcome::Failed
            }
        }
    }
}

struct RunningTask {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives periodic sampling into a [`HistoryStore`]
pub struct CollectionScheduler {
    collector: Arc<Collector>,
    interval: Duration,
    running: Mutex<Option<RunningTask>>,
}

impl CollectionScheduler {
    pub fn new(
        sampler: Arc<dyn MetricsSampler>,
        store: Arc<HistoryStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self::from_parts(sampler, store, config, None, None)
    }

    fn from_parts(
        sampler: Arc<dyn MetricsSampler>,
        store: Arc<HistoryStore>,
        config: SchedulerConfig,
        logger: Option<StructuredLogger>,
        health: Option<HealthRegistry>,
    ) -> Self {
        Self {
            collector: Arc::new(Collector {
                sampler,
                store,
                collecting: AtomicBool::new(false),
                unhealthy_after: config.unhealthy_after,
                metrics: EngineMetrics::new(),
                logger,
                health,
            }),
            interval: config.interval.max(MIN_INTERVAL),
            running: Mutex::new(None),
        }
    }

    pub fn builder() -> CollectionSchedulerBuilder {
        CollectionSchedulerBuilder::new()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.collector.store
    }

    /// Start sampling: one collection immediately, then one per interval.
    ///
    /// Must be called from within a Tokio runtime. Returns `false` without
    /// doing anything when already running.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if running.is_some() {
            debug!("Collection scheduler already running");
            return false;
        }

        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.collector),
            self.interval,
            shutdown_rx,
        ));

        *running = Some(RunningTask { shutdown, handle });
        true
    }

    /// Cancel future collections. An in-flight collection runs to completion.
    ///
    /// Returns `false` when the scheduler was not running.
    pub fn stop(&self) -> bool {
        match self.lock_running().take() {
            Some(task) => {
                // Err only means the task already exited
                let _ = task.shutdown.send(());
                info!("Collection scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the background task, including any in-flight collection
    pub async fn shutdown(&self) -> Result<()> {
        let task = self.lock_running().take();
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            task.handle.await?;
            info!("Collection scheduler shut down");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Collect once outside the schedule, subject to the same overlap guard
    pub async fn collect_now(&self) -> CollectionOutcome {
        self.collector.collect_and_store().await
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunningTask>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CollectionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionScheduler")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for CollectionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    collector: Arc<Collector>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(
        interval_secs = period.as_secs_f64(),
        "Starting metrics collection loop"
    );

    // First tick completes immediately
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                info!("Shutting down metrics collection loop");
                break;
            }
            _ = ticker.tick() => {
                collector.collect_and_store().await;
            }
        }
    }
}

/// Builder for the collection scheduler
pub struct CollectionSchedulerBuilder {
    sampler: Option<Arc<dyn MetricsSampler>>,
    store: Option<Arc<HistoryStore>>,
    config: SchedulerConfig,
    logger: Option<StructuredLogger>,
    health: Option<HealthRegistry>,
}

impl CollectionSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            sampler: None,
            store: None,
            config: SchedulerConfig::default(),
            logger: None,
            health: None,
        }
    }

    pub fn sampler(mut self, sampler: Arc<dyn MetricsSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn store(mut self, store: Arc<HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn unhealthy_after(mut self, failures: u32) -> Self {
        self.config.unhealthy_after = failures;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Report collector health to `registry` after every attempt
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn build(self) -> Result<CollectionScheduler> {
        let sampler = self
            .sampler
            .ok_or_else(|| anyhow::anyhow!("Sampler is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("History store is required"))?;

        Ok(CollectionScheduler::from_parts(
            sampler,
            store,
            self.config,
            self.logger,
            self.health,
        ))
    }
}

impl Default for CollectionSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
