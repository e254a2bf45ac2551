//! ONNX inference using tract
//!
//! Classifiers trained offline are exported to ONNX (one float input of
//! shape `[1, n_features]`; label output first, optional probability output
//! `[1, 2]` second) and run through tract. When no classifier is available
//! the engine falls back to [`FallbackPredictor`].

use super::Classifier;
use crate::error::PredictError;
use crate::models::{FeatureVector, PredictionSource, RawPrediction, CANONICAL_FEATURES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// The family a loaded classifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    LogisticRegression,
    NaiveBayes,
    LinearRegression,
    GradientBoosting,
}

impl ModelKind {
    /// Models looked for by a default deployment, in load order
    pub const DEFAULT_SET: [ModelKind; 5] = [
        ModelKind::RandomForest,
        ModelKind::DecisionTree,
        ModelKind::LogisticRegression,
        ModelKind::NaiveBayes,
        ModelKind::LinearRegression,
    ];

    /// Always primary when loaded
    pub const PREFERRED_PRIMARY: ModelKind = ModelKind::GradientBoosting;

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::NaiveBayes => "Naive Bayes",
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::GradientBoosting => "Gradient Boosting",
        }
    }

    /// Artifact file name in the model directory
    pub fn default_file(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "cardio_model.onnx",
            ModelKind::DecisionTree => "decision_tree.onnx",
            ModelKind::LogisticRegression => "logistic_regression.onnx",
            ModelKind::NaiveBayes => "naive_bayes.onnx",
            ModelKind::LinearRegression => "linear_regression.onnx",
            ModelKind::GradientBoosting => "gradient_boosting.onnx",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A loaded classifier together with its capabilities
pub struct ModelArtifact {
    kind: ModelKind,
    handle: Box<dyn Classifier>,
    has_probability: bool,
    declared_features: Option<Vec<String>>,
}

impl ModelArtifact {
    pub fn new(kind: ModelKind, handle: Box<dyn Classifier>) -> Self {
        let has_probability = handle.supports_probability();
        Self {
            kind,
            handle,
            has_probability,
            declared_features: None,
        }
    }

    /// Attach the feature names the model was trained on
    pub fn with_declared_features(mut self, names: Vec<String>) -> Self {
        self.declared_features = Some(names);
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn has_probability(&self) -> bool {
        self.has_probability
    }

    pub fn declared_features(&self) -> Option<&[String]> {
        self.declared_features.as_deref()
    }

    /// Feature names this model is fed, in order
    pub fn input_features(&self) -> Vec<String> {
        match &self.declared_features {
            Some(names) => names.clone(),
            None => CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build the model's input row from a feature vector
    pub fn input_row(&self, features: &FeatureVector) -> Result<Vec<f32>, PredictError> {
        let projected = match &self.declared_features {
            Some(names) => features.project(names),
            None => features.project(&CANONICAL_FEATURES),
        };
        projected.map_err(|missing| PredictError::FeatureMismatch {
            model: self.name().to_string(),
            missing,
        })
    }

    pub fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let values = self.handle.predict(rows)?;
        if values.len() != rows.len() {
            anyhow::bail!("model returned {} predictions for {} rows", values.len(), rows.len());
        }
        Ok(values)
    }

    pub fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let values = self.handle.predict_proba(rows)?;
        if values.len() != rows.len() {
            anyhow::bail!("model returned {} probabilities for {} rows", values.len(), rows.len());
        }
        Ok(values)
    }

    /// Single-row prediction; the probability is present iff the model has one
    pub fn predict_one(&self, row: &[f32]) -> Result<(f32, Option<f32>)> {
        let (value, probability) = self.handle.predict_one(row)?;
        if self.has_probability && probability.is_none() {
            anyhow::bail!("model declared a probability output but returned none");
        }
        Ok((value, probability))
    }
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind)
            .field("has_probability", &self.has_probability)
            .field("declared_features", &self.declared_features)
            .finish()
    }
}

/// Index of the primary model: Gradient Boosting when loaded, otherwise the
/// first model in load order.
pub fn select_primary(models: &[ModelArtifact]) -> Option<usize> {
    models
        .iter()
        .position(|m| m.kind() == ModelKind::PREFERRED_PRIMARY)
        .or_else(|| (!models.is_empty()).then_some(0))
}

/// Classifier backed by a tract-optimized ONNX graph
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
    has_probability: bool,
}

impl OnnxClassifier {
    pub fn from_bytes(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let model = Self::load_model(model_bytes, num_features)?;
        let has_probability = model.model().outputs.len() > 1;
        Ok(Self {
            model,
            num_features,
            has_probability,
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], num_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn run_row(&self, row: &[f32]) -> Result<TVec<TValue>> {
        if row.len() != self.num_features {
            anyhow::bail!("row has {} features, model expects {}", row.len(), self.num_features);
        }
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.num_features), row.to_vec())?.into();
        self.model.run(tvec!(input.into()))
    }
}

/// First value of an output tensor as f32, whatever its element type
fn output_value(output: &Tensor, index: usize) -> Result<f32> {
    let output = output.cast_to::<f32>()?;
    let view = output.to_array_view::<f32>()?;
    view.iter()
        .nth(index)
        .copied()
        .with_context(|| format!("model output has no value at index {}", index))
}

impl Classifier for OnnxClassifier {
    fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        rows.iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                let label = outputs.first().context("No output from model")?;
                output_value(label, 0)
            })
            .collect()
    }

    fn supports_probability(&self) -> bool {
        self.has_probability
    }

    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        if !self.has_probability {
            anyhow::bail!("model does not expose class probabilities");
        }
        rows.iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                let probabilities = outputs.get(1).context("No probability output from model")?;
                output_value(probabilities, 1)
            })
            .collect()
    }

    /// One graph run yields both the label and the probabilities
    fn predict_one(&self, row: &[f32]) -> Result<(f32, Option<f32>)> {
        let outputs = self.run_row(row)?;
        let label = outputs.first().context("No output from model")?;
        let value = output_value(label, 0)?;
        let probability = if self.has_probability {
            let probabilities = outputs.get(1).context("No probability output from model")?;
            Some(output_value(probabilities, 1)?)
        } else {
            None
        };
        Ok((value, probability))
    }
}

/// Threshold heuristic used when no classifier is loaded
pub struct FallbackPredictor;

impl FallbackPredictor {
    pub const BASE_PROBABILITY: f32 = 0.1;
    pub const MAX_PROBABILITY: f32 = 0.99;

    /// Score raw blood pressure and cholesterol readings.
    ///
    /// Systolic pressure above 130 adds 0.3, above-normal cholesterol adds
    /// 0.2. Readings missing from the vector count as normal.
    pub fn predict(features: &FeatureVector) -> RawPrediction {
        let ap_hi = features.get("ap_hi").unwrap_or(120.0);
        let cholesterol = features.get("cholesterol").unwrap_or(1.0);

        let mut score = 0.0;
        if ap_hi > 130.0 {
            score += 0.3;
        }
        if cholesterol > 1.0 {
            score += 0.2;
        }

        let probability = (Self::BASE_PROBABILITY + score).min(Self::MAX_PROBABILITY);
        RawPrediction {
            label: u8::from(probability > 0.5),
            probability,
            source: PredictionSource::Heuristic,
        }
    }
}
