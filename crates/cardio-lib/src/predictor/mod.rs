//! Multi-model risk prediction engine

mod artifacts;
mod engine;
mod features;
mod inference;
mod output;
mod scaler;

pub use artifacts::{
    load_resources, ArtifactConfig, ArtifactOutcome, ArtifactStatus, LoadReport, LoadedResources,
    ModelEntry, SCALER_ARTIFACT,
};
pub use engine::{EngineConfig, EngineStats, PredictorEngine};
pub use features::{bmi, FeatureBuilder, LifestyleDefaults};
pub use inference::{
    select_primary, FallbackPredictor, ModelArtifact, ModelKind, OnnxClassifier,
};
pub use output::{OutputConfig, OutputFormatter};
pub use scaler::StandardScaler;

use anyhow::Result;

/// A trained classifier, as seen by the engine.
///
/// Every classifier can predict one value per row: a class label for real
/// classifiers, a continuous score for regressors being used as one.
/// Probability output is an optional capability.
pub trait Classifier: Send + Sync {
    /// Predict one value per input row
    fn predict(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>>;

    /// Whether [`Classifier::predict_proba`] is supported
    fn supports_probability(&self) -> bool {
        false
    }

    /// Positive-class probability per input row
    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let _ = rows;
        anyhow::bail!("model does not expose class probabilities")
    }

    /// Value and, when supported, positive-class probability for one row.
    ///
    /// The default makes one batch call per capability; backends that
    /// produce both from a single run should override it.
    fn predict_one(&self, row: &[f32]) -> Result<(f32, Option<f32>)> {
        let rows = [row.to_vec()];
        let value = first(self.predict(&rows)?)?;
        let probability = if self.supports_probability() {
            Some(first(self.predict_proba(&rows)?)?)
        } else {
            None
        };
        Ok((value, probability))
    }
}

fn first(values: Vec<f32>) -> Result<f32> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("model returned no output for the row"))
}
