//! Service configuration

use anyhow::Result;
use cardio_lib::predictor::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name attached to structured log records
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding model artifacts and the reference dataset.
    /// Applied only when `engine` paths are left at their defaults.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Artifact and evaluation settings
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_service_name() -> String {
    "cardio-service".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            model_dir: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional `cardio.toml` and `CARDIO_*`
    /// environment variables (`CARDIO_ENGINE__EVALUATION__SEED=7`)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("cardio").required(false))
            .add_source(
                config::Environment::with_prefix("CARDIO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut loaded = config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            ServiceConfig::default()
        });
        loaded.apply_model_dir();
        Ok(loaded)
    }

    fn apply_model_dir(&mut self) {
        if let Some(dir) = &self.model_dir {
            if self.engine.artifacts.model_dir == EngineConfig::default().artifacts.model_dir {
                let base = EngineConfig::with_model_dir(dir);
                self.engine.artifacts.model_dir = base.artifacts.model_dir;
                if self.engine.evaluation.dataset_path
                    == EngineConfig::default().evaluation.dataset_path
                {
                    self.engine.evaluation.dataset_path = base.evaluation.dataset_path;
                }
            }
        }
    }
}
