//! Observability infrastructure for the predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction outcomes, evaluation runs, loaded models)
//! - Structured JSON logging with tracing

use crate::evaluation::MetricsSnapshot;
use crate::models::PredictionResult;
use crate::predictor::LoadReport;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Evaluation reads a whole dataset, so its buckets reach much further
const EVALUATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    prediction_latency_seconds: Histogram,
    evaluation_duration_seconds: Histogram,
    models_loaded: IntGauge,
    predictions: IntCounter,
    heuristic_predictions: IntCounter,
    rejected_predictions: IntCounter,
    evaluation_fallbacks: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "cardio_prediction_latency_seconds",
                "Time spent producing a single risk prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            evaluation_duration_seconds: register_histogram!(
                "cardio_evaluation_duration_seconds",
                "Time spent benchmarking all loaded models",
                EVALUATION_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_duration_seconds"),

            models_loaded: register_int_gauge!(
                "cardio_models_loaded",
                "Number of classifiers loaded by the predictor engine"
            )
            .expect("Failed to register models_loaded"),

            predictions: register_int_counter!(
                "cardio_predictions_total",
                "Total number of predictions returned"
            )
            .expect("Failed to register predictions"),

            heuristic_predictions: register_int_counter!(
                "cardio_heuristic_predictions_total",
                "Predictions produced by the fallback heuristic"
            )
            .expect("Failed to register heuristic_predictions"),

            rejected_predictions: register_int_counter!(
                "cardio_rejected_predictions_total",
                "Predictions refused because of invalid input or model errors"
            )
            .expect("Failed to register rejected_predictions"),

            evaluation_fallbacks: register_int_counter!(
                "cardio_evaluation_fallbacks_total",
                "Evaluations that served the illustrative snapshot"
            )
            .expect("Failed to register evaluation_fallbacks"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_evaluation_duration(&self, duration_secs: f64) {
        self.inner().evaluation_duration_seconds.observe(duration_secs);
    }

    pub fn set_models_loaded(&self, count: i64) {
        self.inner().models_loaded.set(count);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions.inc();
    }

    pub fn inc_heuristic_predictions(&self) {
        self.inner().heuristic_predictions.inc();
    }

    pub fn inc_rejected_predictions(&self) {
        self.inner().rejected_predictions.inc();
    }

    pub fn inc_evaluation_fallbacks(&self) {
        self.inner().evaluation_fallbacks.inc();
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EngineMetrics")
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, artifact loads,
/// predictions, evaluations and shutdown.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, models_loaded: usize) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            models_loaded = models_loaded,
            "Risk predictor started"
        );
    }

    /// One record per artifact the loader looked for
    pub fn log_load_report(&self, report: &LoadReport) {
        for artifact in &report.artifacts {
            info!(
                event = "artifact_checked",
                service = %self.service_name,
                artifact = %artifact.name,
                path = %artifact.path.display(),
                outcome = ?artifact.outcome,
                "Artifact checked"
            );
        }
        if report.loaded_models() == 0 {
            warn!(
                event = "degraded_mode",
                service = %self.service_name,
                "No classifiers loaded, serving heuristic predictions"
            );
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult) {
        info!(
            event = "prediction_generated",
            service = %self.service_name,
            risk = %result.risk,
            probability = result.probability,
            source = ?result.source,
            low_confidence = result.source.is_low_confidence(),
            "Generated risk prediction"
        );
    }

    pub fn log_evaluation(&self, snapshot: &MetricsSnapshot) {
        if snapshot.is_measured() {
            info!(
                event = "evaluation_completed",
                service = %self.service_name,
                main_model = %snapshot.stats.main_model,
                accuracy = snapshot.stats.accuracy,
                roc_auc = snapshot.stats.roc_auc,
                dataset_size = %snapshot.stats.dataset_size,
                models = snapshot.comparison.len(),
                "Model benchmark available"
            );
        } else {
            warn!(
                event = "evaluation_unavailable",
                service = %self.service_name,
                "Serving illustrative model metrics"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Risk predictor shutting down"
        );
    }
}
