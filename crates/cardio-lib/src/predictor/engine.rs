//! The predictor engine
//!
//! Owns the loaded artifacts for its whole lifetime and serves two calls:
//! single-record [`PredictorEngine::predict`] and cached, best-effort
//! [`PredictorEngine::evaluate`].

use super::artifacts::{load_resources, ArtifactConfig, LoadReport, LoadedResources};
use super::features::FeatureBuilder;
use super::inference::{select_primary, FallbackPredictor, ModelArtifact};
use super::output::OutputFormatter;
use super::scaler::StandardScaler;
use crate::error::{EvaluationError, PredictError};
use crate::evaluation::{DatasetSource, EvaluationConfig, Evaluator, MetricsSnapshot};
use crate::models::{
    FeatureVector, HealthRecord, PredictionResult, PredictionSource, RawPrediction,
};
use crate::observability::EngineMetrics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything needed to construct an engine from disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub artifacts: ArtifactConfig,
    pub evaluation: EvaluationConfig,
}

impl EngineConfig {
    /// Artifacts and the reference dataset both live in `model_dir`
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        let evaluation = EvaluationConfig::default();
        Self {
            evaluation: EvaluationConfig {
                dataset_path: model_dir.join(&evaluation.dataset_path),
                ..evaluation
            },
            artifacts: ArtifactConfig::with_model_dir(model_dir),
        }
    }
}

/// Engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub predictions: u64,
    pub heuristic_predictions: u64,
    pub rejected_predictions: u64,
    pub dataset_reads: u64,
    pub evaluation_runs: u64,
}

pub struct PredictorEngine {
    models: Vec<ModelArtifact>,
    primary: Option<usize>,
    scaler: Option<StandardScaler>,
    report: LoadReport,
    builder: FeatureBuilder,
    formatter: OutputFormatter,
    dataset: Option<Box<dyn DatasetSource>>,
    evaluation: EvaluationConfig,
    snapshot: Mutex<Option<Arc<MetricsSnapshot>>>,
    metrics: EngineMetrics,
    prediction_count: AtomicU64,
    heuristic_count: AtomicU64,
    rejected_count: AtomicU64,
    dataset_reads: AtomicU64,
    evaluation_runs: AtomicU64,
}

impl PredictorEngine {
    /// Load artifacts from disk and point evaluation at the configured CSV
    pub fn new(config: EngineConfig) -> Self {
        let resources = load_resources(&config.artifacts);
        let dataset = match config.evaluation.csv_source() {
            Ok(source) => Some(Box::new(source) as Box<dyn DatasetSource>),
            Err(e) => {
                warn!(error = %e, "Evaluation disabled, serving illustrative metrics");
                None
            }
        };
        Self::from_parts(resources, dataset, config.evaluation)
    }

    /// Assemble an engine from already-loaded parts
    pub fn from_parts(
        resources: LoadedResources,
        dataset: Option<Box<dyn DatasetSource>>,
        evaluation: EvaluationConfig,
    ) -> Self {
        let LoadedResources {
            scaler,
            models,
            report,
        } = resources;
        let primary = select_primary(&models);
        let metrics = EngineMetrics::new();
        metrics.set_models_loaded(models.len() as i64);

        info!(
            models = models.len(),
            primary = primary.map(|i| models[i].name()).unwrap_or("heuristic"),
            scaler = scaler.is_some(),
            "Predictor engine ready"
        );

        Self {
            models,
            primary,
            scaler,
            report,
            builder: FeatureBuilder::new(),
            formatter: OutputFormatter::new(),
            dataset,
            evaluation,
            snapshot: Mutex::new(None),
            metrics,
            prediction_count: AtomicU64::new(0),
            heuristic_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            dataset_reads: AtomicU64::new(0),
            evaluation_runs: AtomicU64::new(0),
        }
    }

    pub fn models(&self) -> &[ModelArtifact] {
        &self.models
    }

    pub fn primary_model(&self) -> Option<&ModelArtifact> {
        self.primary.map(|i| &self.models[i])
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// No classifier loaded; predictions come from the heuristic
    pub fn is_degraded(&self) -> bool {
        self.models.is_empty()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            predictions: self.prediction_count.load(Ordering::Relaxed),
            heuristic_predictions: self.heuristic_count.load(Ordering::Relaxed),
            rejected_predictions: self.rejected_count.load(Ordering::Relaxed),
            dataset_reads: self.dataset_reads.load(Ordering::Relaxed),
            evaluation_runs: self.evaluation_runs.load(Ordering::Relaxed),
        }
    }

    /// Assess one record: build features, run the primary model, attach
    /// the risk category and suggestion.
    pub fn predict(&self, record: &HealthRecord) -> Result<PredictionResult, PredictError> {
        let features = self.builder.build(record).map_err(|e| self.rejected(e))?;
        let raw = self.predict_features(&features)?;
        Ok(self.formatter.format(raw))
    }

    /// Label and probability from the primary model for a built vector
    pub fn predict_features(
        &self,
        features: &FeatureVector,
    ) -> Result<RawPrediction, PredictError> {
        let start = Instant::now();

        let Some(model) = self.primary_model() else {
            debug!("No model loaded, using fallback predictor");
            self.heuristic_count.fetch_add(1, Ordering::Relaxed);
            self.metrics.inc_heuristic_predictions();
            return Ok(self.accepted(FallbackPredictor::predict(features), start));
        };

        let mut row = model.input_row(features).map_err(|e| self.rejected(e))?;
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut row).map_err(|e| self.rejected(e))?;
        }

        let (value, probability) = model.predict_one(&row).map_err(|e| {
            self.rejected(PredictError::Inference {
                model: model.name().to_string(),
                reason: format!("{:#}", e),
            })
        })?;
        let label = u8::from(value > 0.5);

        // Without a probability output the label doubles as the probability
        let probability = probability.unwrap_or_else(|| value.clamp(0.0, 1.0));

        let raw = RawPrediction {
            label,
            probability,
            source: PredictionSource::Model {
                name: model.name().to_string(),
            },
        };
        Ok(self.accepted(raw, start))
    }

    fn accepted(&self, raw: RawPrediction, start: Instant) -> RawPrediction {
        self.prediction_count.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_predictions();
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        raw
    }

    fn rejected(&self, error: PredictError) -> PredictError {
        warn!(error = %error, "Prediction rejected");
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_rejected_predictions();
        error
    }

    /// Benchmark every loaded model against the reference dataset.
    ///
    /// Never fails: when no measurement is possible the illustrative
    /// snapshot is returned. A measured snapshot is computed once and then
    /// served from cache; concurrent first callers wait for the one
    /// computation in flight.
    pub fn evaluate(&self) -> Arc<MetricsSnapshot> {
        let mut cached = match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(snapshot) = cached.as_ref() {
            return Arc::clone(snapshot);
        }

        let start = Instant::now();
        match self.run_evaluation() {
            Ok(snapshot) => {
                let elapsed = start.elapsed();
                self.metrics.observe_evaluation_duration(elapsed.as_secs_f64());
                info!(
                    main_model = %snapshot.stats.main_model,
                    accuracy = snapshot.stats.accuracy,
                    roc_auc = snapshot.stats.roc_auc,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Model evaluation completed"
                );
                let snapshot = Arc::new(snapshot);
                *cached = Some(Arc::clone(&snapshot));
                snapshot
            }
            Err(e) => {
                match e {
                    EvaluationError::NoModels | EvaluationError::DatasetUnavailable(_) => {
                        debug!(reason = %e, "Evaluation unavailable, serving illustrative metrics")
                    }
                    _ => warn!(error = %e, "Evaluation failed, serving illustrative metrics"),
                }
                self.metrics.inc_evaluation_fallbacks();
                Arc::new(MetricsSnapshot::illustrative())
            }
        }
    }

    fn run_evaluation(&self) -> Result<MetricsSnapshot, EvaluationError> {
        let source = match &self.dataset {
            Some(source) if source.is_available() => source,
            Some(source) => {
                return Err(EvaluationError::DatasetUnavailable(PathBuf::from(
                    source.describe(),
                )))
            }
            None => return Err(EvaluationError::DatasetUnavailable(PathBuf::new())),
        };
        let evaluator = Evaluator::new(&self.models, self.scaler.as_ref(), &self.evaluation)?;

        self.evaluation_runs.fetch_add(1, Ordering::Relaxed);
        self.dataset_reads.fetch_add(1, Ordering::Relaxed);
        let dataset = source
            .load()
            .map_err(|e| EvaluationError::Dataset(format!("{:#}", e)))?;
        evaluator.evaluate(dataset)
    }
}

impl std::fmt::Debug for PredictorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorEngine")
            .field("models", &self.models)
            .field("primary", &self.primary)
            .field("scaler", &self.scaler.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}
