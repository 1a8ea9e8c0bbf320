//! Climate Agent - room climate prediction daemon
//!
//! Hosts the object model, exposes the toggle action over HTTP and runs the
//! external predictors when a run is activated.

use agent_lib::{
    health::HealthRegistry,
    model::InMemoryModel,
    observability::{AgentMetrics, StructuredLogger},
    RunController,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting climate-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    info!(
        host_name = %config.host_name,
        model_path = %config.model_path.display(),
        predictors = %config.predictor.working_dir.display(),
        "Agent configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.host_name);

    // Load the object model
    let model = if config.model_path.exists() {
        Arc::new(InMemoryModel::load(&config.model_path)?)
    } else {
        warn!(
            model_path = %config.model_path.display(),
            "Model file not found, starting with an empty model"
        );
        Arc::new(InMemoryModel::new())
    };
    logger.log_startup(AGENT_VERSION, model.len());

    let controller = RunController::builder(model.clone())
        .config(config.predictor.clone())
        .health(health_registry.clone())
        .logger(logger.clone())
        .build();

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        controller.clone(),
        model.clone(),
        health_registry.clone(),
        metrics,
    ));

    // Mark agent as ready once the model is in place
    health_registry.set_ready(true).await;

    // Serve until SIGINT
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
    };
    api::serve(config.api_port, app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    // Stop any in-flight run before persisting
    controller.stop().await;
    model.save(&config.model_path)?;
    info!(model_path = %config.model_path.display(), "Model saved");

    Ok(())
}
