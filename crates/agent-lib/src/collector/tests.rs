//! Scheduler tests with scripted samplers
//!
//! These drive the collection scheduler without touching the host, using
//! samplers that return fixed readings, fail on demand, or block until
//! released.

#[cfg(test)]
mod scheduler_tests {
    use crate::collector::{
        async_trait, CollectionOutcome, CollectionScheduler, CollectionSchedulerBuilder,
        MetricsSampler, SchedulerConfig,
    };
    use crate::health::{components, ComponentStatus, HealthRegistry};
    use crate::history::HistoryStore;
    use crate::models::{CpuReading, MetricsReading, NetworkInterface};
    use anyhow::{bail, Result};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    fn reading(cpu: f64) -> MetricsReading {
        MetricsReading {
            cpu: CpuReading { usage: cpu, cores: 2 },
            network: vec![
                NetworkInterface {
                    name: "lo".to_string(),
                    rx_bytes: 999,
                    tx_bytes: 999,
                },
                NetworkInterface {
                    name: "eth0".to_string(),
                    rx_bytes: 100,
                    tx_bytes: 50,
                },
                NetworkInterface {
                    name: "eth1".to_string(),
                    rx_bytes: 10,
                    tx_bytes: 5,
                },
            ],
            ..Default::default()
        }
    }

    /// Returns readings with increasing CPU, optionally failing every call
    struct ScriptedSampler {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl ScriptedSampler {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MetricsSampler for ScriptedSampler {
        async fn sample(&self) -> Result<MetricsReading> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                bail!("sampler unavailable");
            }
            Ok(reading(call as f64))
        }
    }

    /// Blocks inside `sample` until released
    struct GatedSampler {
        entered: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    impl GatedSampler {
        fn new() -> Self {
            Self {
                entered: Notify::new(),
                release: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsSampler for GatedSampler {
        async fn sample(&self) -> Result<MetricsReading> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(reading(50.0))
        }
    }

    fn scheduler_with(
        sampler: Arc<dyn MetricsSampler>,
        interval: Duration,
    ) -> (CollectionScheduler, Arc<HistoryStore>) {
        let store = Arc::new(HistoryStore::new(10));
        let scheduler = CollectionScheduler::new(
            sampler,
            Arc::clone(&store),
            SchedulerConfig {
                interval,
                ..Default::default()
            },
        );
        (scheduler, store)
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.unhealthy_after, 5);
    }

    #[test]
    fn test_builder_requires_sampler_and_store() {
        let store = Arc::new(HistoryStore::new(5));
        assert_err!(CollectionSchedulerBuilder::new().store(store).build());

        let sampler = Arc::new(ScriptedSampler::new());
        assert_err!(CollectionSchedulerBuilder::new().sampler(sampler).build());
    }

    #[test]
    fn test_builder_clamps_zero_interval() {
        let scheduler = assert_ok!(CollectionScheduler::builder()
            .sampler(Arc::new(ScriptedSampler::new()))
            .store(Arc::new(HistoryStore::new(5)))
            .interval(Duration::ZERO)
            .build());

        assert!(scheduler.interval() > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_collect_now_stores_snapshot_without_loopback() {
        let sampler = Arc::new(ScriptedSampler::new());
        let (scheduler, store) = scheduler_with(sampler, Duration::from_secs(60));

        assert_eq!(scheduler.collect_now().await, CollectionOutcome::Stored);

        let latest = store.get_latest().unwrap();
        assert_eq!(latest.network_rx, 110);
        assert_eq!(latest.network_tx, 55);
        assert!(latest.timestamp > 0);
        assert_eq!(store.get_size(), 1);
    }

    #[tokio::test]
    async fn test_failed_collection_appends_nothing() {
        let sampler = Arc::new(ScriptedSampler::new());
        sampler.set_failing(true);
        let (scheduler, store) = scheduler_with(sampler.clone(), Duration::from_secs(60));

        assert_eq!(scheduler.collect_now().await, CollectionOutcome::Failed);
        assert_eq!(store.get_size(), 0);

        // The guard was released despite the failure
        sampler.set_failing(false);
        assert_eq!(scheduler.collect_now().await, CollectionOutcome::Stored);
        assert_eq!(store.get_size(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_collection_is_skipped() {
        let sampler = Arc::new(GatedSampler::new());
        let (scheduler, store) = scheduler_with(sampler.clone(), Duration::from_secs(60));
        let scheduler = Arc::new(scheduler);

        let in_flight = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.collect_now().await })
        };
        sampler.entered.notified().await;

        assert_eq!(scheduler.collect_now().await, CollectionOutcome::Skipped);

        sampler.release.notify_one();
        assert_eq!(in_flight.await.unwrap(), CollectionOutcome::Stored);
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_size(), 1);
    }

    #[tokio::test]
    async fn test_start_collects_immediately_and_repeats() {
        let sampler = Arc::new(ScriptedSampler::new());
        let (scheduler, store) = scheduler_with(sampler.clone(), Duration::from_millis(20));

        assert!(!scheduler.is_running());
        assert!(scheduler.start());
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(store.get_size() >= 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.get_size() >= 3);

        scheduler.shutdown().await.unwrap();
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let sampler = Arc::new(ScriptedSampler::new());
        let (scheduler, _store) = scheduler_with(sampler.clone(), Duration::from_secs(60));

        assert!(scheduler.start());
        assert!(!scheduler.start());

        tokio::time::sleep(Duration::from_millis(50)).await;
        // A single timer means a single immediate collection
        assert_eq!(sampler.calls(), 1);

        assert!(scheduler.stop());
    }

    #[tokio::test]
    async fn test_stop_halts_future_collections() {
        let sampler = Arc::new(ScriptedSampler::new());
        let (scheduler, _store) = scheduler_with(sampler.clone(), Duration::from_millis(10));

        assert!(!scheduler.stop());

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(scheduler.stop());
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = sampler.calls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sampler.calls(), after_stop);
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_collection_finish() {
        let sampler = Arc::new(GatedSampler::new());
        let (scheduler, store) = scheduler_with(sampler.clone(), Duration::from_secs(60));

        scheduler.start();
        sampler.entered.notified().await;

        let shutdown = scheduler.shutdown();
        let release = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            sampler.release.notify_one();
        };
        let (result, _) = tokio::join!(shutdown, release);

        assert!(result.is_ok());
        assert_eq!(store.get_size(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_survives_failures() {
        let sampler = Arc::new(ScriptedSampler::new());
        sampler.set_failing(true);
        let (scheduler, store) = scheduler_with(sampler.clone(), Duration::from_millis(10));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert!(scheduler.is_running());
        assert!(sampler.calls() >= 2);
        assert_eq!(store.get_size(), 0);

        sampler.set_failing(false);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get_size() >= 1);

        scheduler.stop();
    }

    #[tokio::test]
    async fn test_failures_reported_to_health_registry() {
        let registry = HealthRegistry::new();
        registry.register(components::COLLECTOR).await;

        let sampler = Arc::new(ScriptedSampler::new());
        sampler.set_failing(true);
        let scheduler = CollectionScheduler::builder()
            .sampler(sampler.clone())
            .store(Arc::new(HistoryStore::new(5)))
            .unhealthy_after(2)
            .health(registry.clone())
            .build()
            .unwrap();

        scheduler.collect_now().await;
        let collector = registry.component(components::COLLECTOR).await.unwrap();
        assert_eq!(collector.status, ComponentStatus::Degraded);
        assert!(collector.message.unwrap().contains("sampler unavailable"));

        scheduler.collect_now().await;
        let collector = registry.component(components::COLLECTOR).await.unwrap();
        assert_eq!(collector.status, ComponentStatus::Unhealthy);

        sampler.set_failing(false);
        scheduler.collect_now().await;
        let collector = registry.component(components::COLLECTOR).await.unwrap();
        assert_eq!(collector.status, ComponentStatus::Healthy);
    }
}
