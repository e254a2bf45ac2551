//! HTTP API for health checks, Prometheus metrics and model insights

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cardio_lib::{
    evaluation::MetricsSnapshot,
    health::{components, ComponentStatus, HealthRegistry},
    predictor::{LoadReport, PredictorEngine},
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub engine: Arc<PredictorEngine>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, engine: Arc<PredictorEngine>) -> Self {
        Self {
            health_registry,
            engine,
        }
    }
}

/// Body of `GET /model-insights`
#[derive(Debug, Serialize)]
pub struct ModelInsights<'a> {
    /// Model used for predictions; `None` while the heuristic answers
    pub primary_model: Option<&'a str>,
    pub degraded: bool,
    pub scaler_loaded: bool,
    pub load_report: &'a LoadReport,
    pub metrics: &'a MetricsSnapshot,
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // Heuristic fallback still answers
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
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
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Load report plus the benchmark snapshot.
///
/// The first call may read the reference dataset, so evaluation runs on the
/// blocking pool; later calls are served from the engine's cache.
async fn model_insights(State(state): State<Arc<AppState>>) -> Response {
    let engine = Arc::clone(&state.engine);
    let snapshot = match tokio::task::spawn_blocking(move || engine.evaluate()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "Evaluation task failed");
            state
                .health_registry
                .set_degraded(components::EVALUATION, "Evaluation task failed")
                .await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "evaluation task failed" })),
            )
                .into_response();
        }
    };
    state.health_registry.record_evaluation(&snapshot).await;

    let engine = &state.engine;
    Json(ModelInsights {
        primary_model: engine.primary_model().map(|m| m.name()),
        degraded: engine.is_degraded(),
        scaler_loaded: engine.has_scaler(),
        load_report: engine.load_report(),
        metrics: &snapshot,
    })
    .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/model-insights", get(model_insights))
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
