//! Error taxonomy for the predictor engine
//!
//! Only [`PredictError`] crosses the engine boundary. Artifact and evaluation
//! failures are absorbed: the former into the load report, the latter into
//! the illustrative metrics snapshot.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a single artifact. Never fatal to the engine.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("failed to load model {path}: {reason}")]
    Model { path: PathBuf, reason: String },
}

/// Failure of a single prediction call
#[derive(Debug, Error)]
pub enum PredictError {
    /// The model declares features the builder cannot provide
    #[error("model {model} expects features that are not available: {}", missing.join(", "))]
    FeatureMismatch { model: String, missing: Vec<String> },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("scaler expects {expected} features, got {actual}")]
    Scaler { expected: usize, actual: usize },

    #[error("inference failed for {model}: {reason}")]
    Inference { model: String, reason: String },
}

impl PredictError {
    /// Message suitable for showing to the person who requested the assessment
    pub fn user_message(&self) -> &'static str {
        match self {
            PredictError::InvalidRecord(_) => {
                "Could not assess your risk: some measurements look invalid. Please check them and try again."
            }
            _ => "Could not assess your risk right now. Please try again later.",
        }
    }
}

/// Reasons a measured evaluation could not be produced
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("no models loaded")]
    NoModels,

    #[error("reference dataset not available at {0}")]
    DatasetUnavailable(PathBuf),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("model {model} failed during evaluation: {reason}")]
    Model { model: String, reason: String },

    #[error(transparent)]
    Predict(#[from] PredictError),
}
