//! HTTP API: the toggle action, run status, model snapshot, health and metrics

use agent_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    model::InMemoryModel,
    observability::AgentMetrics,
    RunController, RunState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: RunController,
    pub model: Arc<InMemoryModel>,
    pub health_registry: HealthRegistry,
    pub metrics: AgentMetrics,
}

impl AppState {
    pub fn new(
        controller: RunController,
        model: Arc<InMemoryModel>,
        health_registry: HealthRegistry,
        metrics: AgentMetrics,
    ) -> Self {
        Self {
            controller,
            model,
            health_registry,
            metrics,
        }
    }
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    state: RunState,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Start a run when idle, stop the current one when running
async fn toggle(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.controller.toggle().await {
        Ok(run_state) => {
            info!(state = ?run_state, "Toggle handled");
            (StatusCode::OK, Json(ToggleResponse { state: run_state })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Toggle failed");
            state
                .health_registry
                .set_unhealthy(components::CONTROLLER, e.to_string())
                .await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Current lifecycle state and the outcome of the last finished run
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.status())
}

/// Snapshot of every object in the model
async fn model(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.model.snapshot())
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // The last run failed but the next activation may still succeed
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/toggle", post(toggle))
        .route("/api/v1/status", get(status))
        .route("/api/v1/model", get(model))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
