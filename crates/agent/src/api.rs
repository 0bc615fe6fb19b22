//! HTTP API for health checks, Prometheus metrics, metric history and alerts

use crate::rules::RuleSource;
use agent_lib::{
    alerting::{EvaluationEngine, GeneratedAlert},
    collector::{CollectionOutcome, CollectionScheduler, MetricsSampler},
    health::{components, ComponentStatus, HealthRegistry},
    history::HistoryStore,
    models::Snapshot,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Consecutive evaluation failures before the evaluator is reported unhealthy
const EVALUATOR_UNHEALTHY_AFTER: u32 = 3;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub history: Arc<HistoryStore>,
    pub scheduler: Arc<CollectionScheduler>,
    pub sampler: Arc<dyn MetricsSampler>,
    pub engine: Arc<EvaluationEngine>,
    pub rules: RuleSource,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub minutes: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectResponse {
    pub outcome: CollectionOutcome,
    pub size: usize,
}

/// Health check response - returns 200 if operational, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<Snapshot>> {
    Json(state.history.get_history(query.minutes))
}

async fn latest(State(state): State<Arc<AppState>>) -> Response {
    match state.history.get_latest() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No snapshots collected yet"),
    }
}

async fn collect(State(state): State<Arc<AppState>>) -> Json<CollectResponse> {
    let outcome = state.scheduler.collect_now().await;
    Json(CollectResponse {
        outcome,
        size: state.history.get_size(),
    })
}

/// Sample live metrics and evaluate the current rule set against them
async fn evaluate(State(state): State<Arc<AppState>>) -> Response {
    let reading = match state.sampler.sample().await {
        Ok(reading) => reading,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Live sample for evaluation failed");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, format!("{:#}", e));
        }
    };

    let rules = match state.rules.load().await {
        Ok(rules) => rules,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Failed to load alert rules");
            state
                .health_registry
                .record_failure(
                    components::EVALUATOR,
                    format!("{:#}", e),
                    EVALUATOR_UNHEALTHY_AFTER,
                )
                .await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e));
        }
    };

    state
        .health_registry
        .record_success(components::EVALUATOR)
        .await;

    let alerts: Vec<GeneratedAlert> = state.engine.evaluate_metrics(&reading, &rules);
    Json(alerts).into_response()
}

async fn reset_cooldowns(State(state): State<Arc<AppState>>) -> StatusCode {
    state.engine.reset_cooldowns();
    info!("All alert cooldowns reset");
    StatusCode::NO_CONTENT
}

async fn reset_rule_cooldown(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<String>,
) -> Response {
    if state.engine.reset_rule_cooldown(&rule_id) {
        info!(rule_id = %rule_id, "Alert cooldown reset");
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Rule {} has no active cooldown", rule_id),
        )
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/metrics/history", get(history))
        .route("/api/metrics/latest", get(latest))
        .route("/api/metrics/collect", post(collect))
        .route("/api/alerts/evaluate", get(evaluate))
        .route("/api/alerts/cooldowns/reset", post(reset_cooldowns))
        .route("/api/alerts/cooldowns/:rule_id", delete(reset_rule_cooldown))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
