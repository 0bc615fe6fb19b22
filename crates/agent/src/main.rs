//! Homeserver monitor - host metrics history and threshold alerting
//!
//! Samples host metrics on a fixed cadence, keeps a bounded history and
//! evaluates alert rules on request.

use agent_lib::{
    alerting::{CooldownLedger, EvaluationEngine},
    collector::{CollectionScheduler, MetricsSampler, SysinfoSampler},
    health::{components, HealthRegistry},
    history::HistoryStore,
    observability::{EngineMetrics, StructuredLogger},
};
use anyhow::Result;
use homeserver_monitor::{
    api::{self, AppState},
    config::MonitorConfig,
    rules::RuleSource,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = MonitorConfig::load()?;
    let labels = config.category_labels()?;
    info!(
        host = %config.host_name,
        rules_path = ?config.rules_path,
        "Monitor configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::EVALUATOR).await;

    let metrics = EngineMetrics::new();
    metrics.set_history_size(0);

    let logger = StructuredLogger::new(&config.host_name);
    logger.log_startup(
        MONITOR_VERSION,
        config.collection_interval_secs,
        config.history_capacity,
    );

    let history = Arc::new(HistoryStore::new(config.history_capacity));
    let sampler: Arc<dyn MetricsSampler> = Arc::new(SysinfoSampler::new());

    let scheduler = Arc::new(
        CollectionScheduler::builder()
            .sampler(Arc::clone(&sampler))
            .store(Arc::clone(&history))
            .interval(config.collection_interval())
            .unhealthy_after(config.unhealthy_after_failures)
            .logger(logger.clone())
            .health(health_registry.clone())
            .build()?,
    );

    let engine = Arc::new(
        EvaluationEngine::new(Arc::new(CooldownLedger::new()))
            .with_labels(labels)
            .with_logger(logger.clone()),
    );

    scheduler.start();

    let app_state = Arc::new(AppState {
        health_registry: health_registry.clone(),
        history,
        scheduler: Arc::clone(&scheduler),
        sampler,
        engine,
        rules: RuleSource::new(config.rules_path.clone()),
    });

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => error!(error = %format!("{:#}", e), "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    health_registry.set_ready(false).await;
    scheduler.shutdown().await?;
    info!("Shutting down");

    Ok(())
}
