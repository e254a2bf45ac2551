//! Benchmarking of loaded models against the reference dataset
//!
//! Reproduces the inference-time feature derivation on the dataset (BMI,
//! per-model projection, scaling), scores every loaded model and produces a
//! [`MetricsSnapshot`]. The engine decides when to run it and caches the
//! result; this module only computes.

mod dataset;
mod metrics;
mod snapshot;

#[cfg(test)]
mod tests;

pub use dataset::{
    holdout_indices, CsvDataset, Dataset, DatasetSource, FeatureTable, TARGET_COLUMN,
};
pub use metrics::{roc_auc, round_to, to_binary_labels, ConfusionCounts};
pub use snapshot::{format_count, ComparisonRow, MetricsSnapshot, ModelStats, SnapshotOrigin};

use crate::error::{EvaluationError, PredictError};
use crate::predictor::{select_primary, ModelArtifact, StandardScaler};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Datasets larger than this are evaluated on a held-out slice
pub const DEFAULT_SPLIT_THRESHOLD_ROWS: usize = 10_000;

/// Seed of the held-out shuffle
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Configuration for evaluation runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Reference dataset location
    pub dataset_path: PathBuf,
    /// Field delimiter of the dataset file
    pub delimiter: char,
    /// Row count above which a held-out slice is used
    pub split_threshold_rows: usize,
    /// Fraction of rows held out when splitting
    pub test_fraction: f64,
    /// Seed for the held-out shuffle
    pub seed: u64,
    /// Cut-off applied to continuous model output
    pub decision_threshold: f32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("final_cardio_train_data.csv"),
            delimiter: ',',
            split_threshold_rows: DEFAULT_SPLIT_THRESHOLD_ROWS,
            test_fraction: 0.2,
            seed: DEFAULT_SPLIT_SEED,
            decision_threshold: 0.5,
        }
    }
}

impl EvaluationConfig {
    /// The csv reader splits on a single byte, so only ASCII delimiters work
    pub fn csv_source(&self) -> Result<CsvDataset, EvaluationError> {
        if !self.delimiter.is_ascii() {
            return Err(EvaluationError::Dataset(format!(
                "delimiter {:?} is not an ASCII character",
                self.delimiter
            )));
        }
        Ok(CsvDataset::new(&self.dataset_path).with_delimiter(self.delimiter as u8))
    }
}

/// Scores a fixed set of models on a dataset
pub struct Evaluator<'a> {
    models: &'a [ModelArtifact],
    primary: usize,
    scaler: Option<&'a StandardScaler>,
    config: &'a EvaluationConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        models: &'a [ModelArtifact],
        scaler: Option<&'a StandardScaler>,
        config: &'a EvaluationConfig,
    ) -> Result<Self, EvaluationError> {
        let primary = select_primary(models).ok_or(EvaluationError::NoModels)?;
        Ok(Self {
            models,
            primary,
            scaler,
            config,
        })
    }

    pub fn evaluate(&self, mut dataset: Dataset) -> Result<MetricsSnapshot, EvaluationError> {
        if dataset.is_empty() {
            return Err(EvaluationError::Dataset("dataset has no rows".to_string()));
        }
        dataset.derive_bmi();

        let total_rows = dataset.len();
        let (table, labels) = dataset.into_features_and_target();
        let feature_count = table.width();

        let (table, labels) = if total_rows > self.config.split_threshold_rows {
            let indices =
                holdout_indices(total_rows, self.config.test_fraction, self.config.seed);
            (table.select_rows(&indices), dataset::select(&labels, &indices))
        } else {
            (table, labels)
        };
        debug!(
            total_rows,
            evaluated_rows = table.len(),
            features = feature_count,
            "Evaluating models"
        );

        let mut stats = None;
        let mut comparison = Vec::with_capacity(self.models.len());
        for (i, model) in self.models.iter().enumerate() {
            let rows = self.model_input(model, &table)?;
            let raw = model.predict(&rows).map_err(|e| model_error(model, e))?;
            if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
                return Err(EvaluationError::Model {
                    model: model.name().to_string(),
                    reason: format!("non-finite prediction {}", bad),
                });
            }
            let predicted = to_binary_labels(&raw, self.config.decision_threshold);
            let counts = ConfusionCounts::from_labels(&labels, &predicted);

            if i == self.primary {
                let scores = if model.has_probability() {
                    model.predict_proba(&rows).map_err(|e| model_error(model, e))?
                } else {
                    raw
                };
                let auc = roc_auc(&labels, &scores).ok_or_else(|| {
                    EvaluationError::Dataset(
                        "ROC-AUC undefined: single class or non-finite scores".to_string(),
                    )
                })?;
                stats = Some(ModelStats {
                    main_model: model.name().to_string(),
                    accuracy: round_to(counts.accuracy() * 100.0, 1),
                    roc_auc: round_to(auc, 2),
                    dataset_size: format_count(total_rows),
                    features: feature_count,
                });
            }

            debug!(model = model.name(), accuracy = counts.accuracy(), "Model scored");
            comparison.push(ComparisonRow {
                name: model.name().to_string(),
                accuracy: round_to(counts.accuracy() * 100.0, 1),
                precision: round_to(counts.precision(), 2),
                recall: round_to(counts.recall(), 2),
                f1: round_to(counts.f1(), 2),
            });
        }

        // Stable: equal accuracies keep load order
        comparison.sort_by(|a, b| {
            b.accuracy
                .partial_cmp(&a.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let stats = stats.ok_or(EvaluationError::NoModels)?;
        Ok(MetricsSnapshot {
            stats,
            comparison,
            origin: SnapshotOrigin::Measured,
        })
    }

    /// Dataset rows as the model sees them at inference time
    fn model_input(
        &self,
        model: &ModelArtifact,
        table: &FeatureTable,
    ) -> Result<Vec<Vec<f32>>, EvaluationError> {
        let mut rows = table
            .project(&model.input_features())
            .map_err(|missing| PredictError::FeatureMismatch {
                model: model.name().to_string(),
                missing,
            })?;
        if let Some(scaler) = self.scaler {
            scaler.transform_rows(&mut rows)?;
        }
        Ok(rows)
    }
}

fn model_error(model: &ModelArtifact, e: anyhow::Error) -> EvaluationError {
    EvaluationError::Model {
        model: model.name().to_string(),
        reason: format!("{:#}", e),
    }
}
