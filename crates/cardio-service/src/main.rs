//! Cardio Service - cardiovascular risk predictor host
//!
//! Loads the trained classifiers, benchmarks them against the reference
//! dataset and exposes health, Prometheus and model insight endpoints.

use anyhow::Result;
use cardio_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    predictor::PredictorEngine,
};
use cardio_service::{api, config};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cardio-service");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(
        model_dir = ?config.engine.artifacts.model_dir,
        dataset = ?config.engine.evaluation.dataset_path,
        "Service configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::RESOURCE_LOADER).await;
    health_registry.register(components::INFERENCE).await;
    health_registry.register(components::EVALUATION).await;

    let logger = StructuredLogger::new(&config.service_name);

    // Artifact loading touches the filesystem and parses ONNX graphs
    let engine_config = config.engine.clone();
    let engine =
        Arc::new(tokio::task::spawn_blocking(move || PredictorEngine::new(engine_config)).await?);
    logger.log_load_report(engine.load_report());
    health_registry.sync_engine(&engine).await;
    logger.log_startup(SERVICE_VERSION, engine.models().len());

    // Warm the evaluation cache so the first metrics request is served from memory
    {
        let engine = Arc::clone(&engine);
        let registry = health_registry.clone();
        let logger = logger.clone();
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || engine.evaluate()).await {
                Ok(snapshot) => {
                    logger.log_evaluation(&snapshot);
                    registry.record_evaluation(&snapshot).await;
                }
                Err(e) => {
                    error!(error = %e, "Evaluation task failed");
                    registry
                        .set_degraded(components::EVALUATION, "Evaluation task failed")
                        .await;
                }
            }
        });
    }

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), Arc::clone(&engine)));

    // Predictions are available (model or heuristic) once artifacts are loaded
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal or server exit
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    logger.log_shutdown("API server task panicked");
                }
            }
        }
    }
    info!("Shutting down");

    Ok(())
}
