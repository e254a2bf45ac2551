//! Resource loading for the predictor engine
//!
//! Loads the optional scaler and every configured classifier from the model
//! directory. Each artifact is loaded independently and best-effort: a
//! missing or corrupt file is logged, recorded in the [`LoadReport`] and
//! skipped. Nothing is retried for the lifetime of the engine.

use super::inference::{ModelArtifact, ModelKind, OnnxClassifier};
use super::scaler::StandardScaler;
use crate::error::ArtifactError;
use crate::models::CANONICAL_FEATURES;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Report name of the scaler artifact
pub const SCALER_ARTIFACT: &str = "Scaler";

/// Suffix of the optional feature-name sidecar next to each model file
const FEATURES_SIDECAR_SUFFIX: &str = ".features.json";

/// One classifier in the artifact table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub kind: ModelKind,
    pub file: String,
}

/// Configuration for artifact discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding the scaler and model files
    pub model_dir: PathBuf,
    /// Scaler file name inside `model_dir`
    pub scaler_file: String,
    /// Classifiers to load, in load order
    pub models: Vec<ModelEntry>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            scaler_file: "cardio_model_scaler.json".to_string(),
            models: ModelKind::DEFAULT_SET
                .iter()
                .map(|kind| ModelEntry {
                    kind: *kind,
                    file: kind.default_file().to_string(),
                })
                .collect(),
        }
    }
}

impl ArtifactConfig {
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ..Self::default()
        }
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_file)
    }
}

/// Outcome of loading a single artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Loaded { sha256: String },
    Missing,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactStatus {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: ArtifactOutcome,
}

/// What the resource loader found on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub artifacts: Vec<ArtifactStatus>,
}

impl LoadReport {
    fn record(&mut self, name: &str, path: &Path, result: Result<String, &ArtifactError>) {
        let outcome = match result {
            Ok(sha256) => ArtifactOutcome::Loaded { sha256 },
            Err(ArtifactError::Missing(_)) => ArtifactOutcome::Missing,
            Err(e) => ArtifactOutcome::Failed {
                reason: e.to_string(),
            },
        };
        self.artifacts.push(ArtifactStatus {
            name: name.to_string(),
            path: path.to_path_buf(),
            outcome,
        });
    }

    pub fn loaded_models(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.name != SCALER_ARTIFACT)
            .filter(|a| matches!(a.outcome, ArtifactOutcome::Loaded { .. }))
            .count()
    }

    pub fn scaler_loaded(&self) -> bool {
        self.artifacts.iter().any(|a| {
            a.name == SCALER_ARTIFACT && matches!(a.outcome, ArtifactOutcome::Loaded { .. })
        })
    }

    /// Artifacts that were present but could not be loaded
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactStatus> {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.outcome, ArtifactOutcome::Failed { .. }))
    }
}

/// Scaler and classifiers ready to hand to the engine
#[derive(Debug, Default)]
pub struct LoadedResources {
    pub scaler: Option<StandardScaler>,
    pub models: Vec<ModelArtifact>,
    pub report: LoadReport,
}

impl LoadedResources {
    /// Resources assembled in memory rather than read from disk
    pub fn new(models: Vec<ModelArtifact>, scaler: Option<StandardScaler>) -> Self {
        Self {
            scaler,
            models,
            report: LoadReport::default(),
        }
    }
}

/// Load the scaler and every configured classifier
pub fn load_resources(config: &ArtifactConfig) -> LoadedResources {
    let mut report = LoadReport::default();

    let scaler_path = config.scaler_path();
    let scaler = match load_scaler(&scaler_path) {
        Ok((scaler, checksum)) => {
            info!(path = ?scaler_path, width = scaler.width(), "Scaler loaded");
            report.record(SCALER_ARTIFACT, &scaler_path, Ok(checksum));
            Some(scaler)
        }
        Err(e) => {
            log_failure(SCALER_ARTIFACT, &e);
            report.record(SCALER_ARTIFACT, &scaler_path, Err(&e));
            None
        }
    };

    let mut models = Vec::with_capacity(config.models.len());
    for entry in &config.models {
        let path = config.model_dir.join(&entry.file);
        match load_model(entry.kind, &path) {
            Ok((model, checksum)) => {
                info!(
                    model = %entry.kind,
                    path = ?path,
                    probability = model.has_probability(),
                    declared_features = model.declared_features().map(|f| f.len()),
                    "Model loaded"
                );
                if model.declared_features().is_none() {
                    warn!(
                        model = %entry.kind,
                        features = ?CANONICAL_FEATURES,
                        "No feature sidecar; assuming the canonical order including BMI"
                    );
                }
                report.record(entry.kind.display_name(), &path, Ok(checksum));
                models.push(model);
            }
            Err(e) => {
                log_failure(entry.kind.display_name(), &e);
                report.record(entry.kind.display_name(), &path, Err(&e));
            }
        }
    }

    if models.is_empty() {
        warn!(
            model_dir = ?config.model_dir,
            "No models loaded, predictions will use the heuristic fallback"
        );
    }

    LoadedResources {
        scaler,
        models,
        report,
    }
}

fn log_failure(name: &str, error: &ArtifactError) {
    match error {
        ArtifactError::Missing(path) => {
            debug!(artifact = %name, path = ?path, "Artifact not present")
        }
        e => warn!(artifact = %name, error = %e, "Failed to load artifact, skipping"),
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_scaler(path: &Path) -> Result<(StandardScaler, String), ArtifactError> {
    let bytes = read_artifact(path)?;
    let scaler = StandardScaler::from_json(&bytes).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok((scaler, compute_checksum(&bytes)))
}

fn load_model(kind: ModelKind, path: &Path) -> Result<(ModelArtifact, String), ArtifactError> {
    let bytes = read_artifact(path)?;
    let declared = load_declared_features(&sidecar_path(path))?;
    let num_features = declared
        .as_ref()
        .map(|names| names.len())
        .unwrap_or(CANONICAL_FEATURES.len());

    let classifier =
        OnnxClassifier::from_bytes(&bytes, num_features).map_err(|e| ArtifactError::Model {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

    let mut model = ModelArtifact::new(kind, Box::new(classifier));
    if let Some(names) = declared {
        model = model.with_declared_features(names);
    }
    Ok((model, compute_checksum(&bytes)))
}

/// `models/cardio_model.onnx` -> `models/cardio_model.features.json`
fn sidecar_path(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    model_path.with_file_name(format!("{}{}", stem, FEATURES_SIDECAR_SUFFIX))
}

fn load_declared_features(path: &Path) -> Result<Option<Vec<String>>, ArtifactError> {
    let bytes = match read_artifact(path) {
        Ok(bytes) => bytes,
        Err(ArtifactError::Missing(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let names: Vec<String> = serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if names.is_empty() {
        return Err(ArtifactError::Parse {
            path: path.to_path_buf(),
            reason: "feature list is empty".to_string(),
        });
    }
    Ok(Some(names))
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
