//! Cardiovascular risk predictor library
//!
//! This crate provides the core functionality for:
//! - Loading trained classifiers and the feature scaler
//! - Feature derivation and risk prediction with a heuristic fallback
//! - Benchmarking loaded models against the reference dataset
//! - Lifestyle screening ahead of the clinical stage
//! - Health checks and observability

pub mod error;
pub mod evaluation;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod triage;

pub use error::{ArtifactError, EvaluationError, PredictError};
pub use evaluation::{ComparisonRow, MetricsSnapshot, ModelStats, SnapshotOrigin};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use predictor::{EngineConfig, PredictorEngine};
pub use triage::{screen_lifestyle, LifestyleAnswers, Screening};
