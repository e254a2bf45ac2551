//! Health check infrastructure for the risk predictor
//!
//! Provides component health tracking and status reporting for
//! liveness and readiness checks.

use crate::evaluation::MetricsSnapshot;
use crate::predictor::PredictorEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const RESOURCE_LOADER: &str = "resource_loader";
    pub const INFERENCE: &str = "inference";
    pub const EVALUATION: &str = "evaluation";
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Reflect the engine's load outcome in component health
    ///
    /// A missing scaler or a failed artifact degrades the loader; no
    /// classifier at all degrades inference. Neither is fatal since the
    /// heuristic keeps predictions flowing.
    pub async fn sync_engine(&self, engine: &PredictorEngine) {
        let report = engine.load_report();
        let failed: Vec<&str> = report.failures().map(|a| a.name.as_str()).collect();
        if !failed.is_empty() {
            self.set_degraded(
                components::RESOURCE_LOADER,
                format!("Failed to load: {}", failed.join(", ")),
            )
            .await;
        } else if !engine.has_scaler() {
            self.set_degraded(components::RESOURCE_LOADER, "Scaler not loaded")
                .await;
        } else {
            self.set_healthy(components::RESOURCE_LOADER).await;
        }

        match engine.primary_model() {
            Some(_) => self.set_healthy(components::INFERENCE).await,
            None => {
                self.set_degraded(
                    components::INFERENCE,
                    "No classifier loaded, using heuristic fallback",
                )
                .await
            }
        }
    }

    /// Record whether model metrics are measured or illustrative
    pub async fn record_evaluation(&self, snapshot: &MetricsSnapshot) {
        if snapshot.is_measured() {
            self.set_healthy(components::EVALUATION).await;
        } else {
            self.set_degraded(components::EVALUATION, "Serving illustrative metrics")
                .await;
        }
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        // Not ready if any critical component is unhealthy
        let critical_healthy = health.status != ComponentStatus::Unhealthy;
        
        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Predictor not yet initialized".to_string()),
            }
        } else if !critical_healthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationConfig;
    use crate::predictor::{
        ArtifactOutcome, ArtifactStatus, Classifier, LoadedResources, ModelArtifact, ModelKind,
        StandardScaler,
    };
    use std::path::PathBuf;

    struct Zero;

    impl Classifier for Zero {
        fn predict(&self, rows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.0; rows.len()])
        }
    }

    fn engine(models: Vec<ModelArtifact>, scaler: Option<StandardScaler>) -> PredictorEngine {
        PredictorEngine::from_parts(
            LoadedResources::new(models, scaler),
            None,
            EvaluationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_health_registry_component_registration() {
        let registry = HealthRegistry::new();
        registry.register(components::INFERENCE).await;

        let health = registry.health().await;
        assert!(health.components.contains_key(components::INFERENCE));
        assert_eq!(
            health.components[components::INFERENCE].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_health_registry_degraded_status() {
        let registry = HealthRegistry::new();
        registry.register(components::RESOURCE_LOADER).await;
        registry.register(components::INFERENCE).await;

        registry
            .set_degraded(components::RESOURCE_LOADER, "Scaler not loaded")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_health_registry_unhealthy_status() {
        let registry = HealthRegistry::new();
        registry.register(components::RESOURCE_LOADER).await;
        registry.register(components::INFERENCE).await;

        registry
            .set_unhealthy(components::INFERENCE, "Inference panicked")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_ready_when_set() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(readiness.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register(components::INFERENCE).await;
        registry.set_ready(true).await;
        registry.set_unhealthy(components::INFERENCE, "Failed").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
    }

    #[tokio::test]
    async fn test_sync_engine_without_models_is_degraded_but_ready() {
        let registry = HealthRegistry::new();
        registry.sync_engine(&engine(Vec::new(), None)).await;
        registry.set_ready(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::INFERENCE].status,
            ComponentStatus::Degraded
        );
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_sync_engine_fully_loaded_is_healthy() {
        let registry = HealthRegistry::new();
        let models = vec![ModelArtifact::new(ModelKind::DecisionTree, Box::new(Zero))];
        let scaler = StandardScaler::new(vec![0.0; 12], vec![1.0; 12]).unwrap();
        registry.sync_engine(&engine(models, Some(scaler))).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(
            health.components[components::INFERENCE].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_sync_engine_reports_failed_artifacts() {
        let registry = HealthRegistry::new();
        let mut resources = LoadedResources::new(Vec::new(), None);
        resources.report.artifacts.push(ArtifactStatus {
            name: "Naive Bayes".to_string(),
            path: PathBuf::from("naive_bayes.onnx"),
            outcome: ArtifactOutcome::Failed {
                reason: "truncated".to_string(),
            },
        });
        let engine = PredictorEngine::from_parts(resources, None, EvaluationConfig::default());
        registry.sync_engine(&engine).await;

        let health = registry.health().await;
        let loader = &health.components[components::RESOURCE_LOADER];
        assert_eq!(loader.status, ComponentStatus::Degraded);
        assert!(loader.message.as_deref().unwrap_or("").contains("Naive Bayes"));
    }

    #[tokio::test]
    async fn test_record_evaluation() {
        let registry = HealthRegistry::new();
        registry
            .record_evaluation(&MetricsSnapshot::illustrative())
            .await;

        let health = registry.health().await;
        assert_eq!(
            health.components[components::EVALUATION].status,
            ComponentStatus::Degraded
        );
    }
}
