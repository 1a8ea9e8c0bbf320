//! Integration tests for the agent API endpoints

#[allow(dead_code)]
#[path = "../src/api.rs"]
mod api;

use agent_lib::{
    health::{components, HealthRegistry},
    model::{InMemoryModel, ModelSnapshot},
    observability::AgentMetrics,
    predictor::{Invocation, PredictorConfig, PredictorLauncher, PredictorOutput, REGRESSION},
    PredictionError, RunController,
};
use api::{create_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Predictors answering with the canned scenario output
struct ScenarioLauncher {
    delay: Duration,
}

#[async_trait]
impl PredictorLauncher for ScenarioLauncher {
    async fn run(&self, invocation: &Invocation) -> Result<PredictorOutput, PredictionError> {
        tokio::time::sleep(self.delay).await;
        let output = if invocation.predictor == REGRESSION {
            "21.7,19.2\n"
        } else {
            "1,0\n"
        };
        Ok(PredictorOutput {
            exit_code: Some(0),
            output: output.to_string(),
        })
    }
}

const SCENARIO_MODEL: &str = r#"{
  "objects": [
    {"name": "room", "class": "Habitacion",
     "attributes": {"temperaturaIdealPromedio": 22.5, "luzIdealPromedio": 18.0}},
    {"name": "clock", "class": "Tiempo", "attributes": {"mes": 6}},
    {"name": "hum", "class": "SensorHumedad", "attributes": {"valor": 40.2}},
    {"name": "co2", "class": "SensorCO2", "attributes": {"valor": 410.7}},
    {"name": "ac", "class": "AireAcondicionado", "attributes": {"temperatura": 0}},
    {"name": "light", "class": "Luz", "attributes": {"intensidad": 0}},
    {"name": "regulator", "class": "ReguladorHumedad", "attributes": {"encendido": false}},
    {"name": "purifier", "class": "PurificadorDeAire", "attributes": {"encendido": true}},
    {"name": "result", "class": "AlgorithmResult",
     "attributes": {"executionId": "", "temperatura": 0, "luminosidad": 0}}
  ]
}"#;

async fn setup_test_app(delay: Duration) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let snapshot: ModelSnapshot = serde_json::from_str(SCENARIO_MODEL).unwrap();
    let model = Arc::new(InMemoryModel::from_snapshot(snapshot));

    let controller = RunController::builder(model.clone())
        .launcher(Arc::new(ScenarioLauncher { delay }))
        .config(PredictorConfig::default())
        .health(health_registry.clone())
        .build();

    let metrics = AgentMetrics::new();
    let state = Arc::new(AppState::new(controller, model, health_registry, metrics));
    let router = create_router(state.clone());

    (router, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app(Duration::ZERO).await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app(Duration::ZERO).await;

    state
        .health_registry
        .set_degraded(components::PREDICTORS, "predictor exited with 1")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["components"]["predictors"]["message"],
        "predictor exited with 1"
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app(Duration::ZERO).await;

    state
        .health_registry
        .set_unhealthy(components::CONTROLLER, "worker panicked")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_follows_model_load() {
    let (app, state) = setup_test_app(Duration::ZERO).await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let readiness = body_json(response).await;
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["reason"], "Model not loaded");

    state.health_registry.set_ready(true).await;

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_status_when_idle() {
    let (app, _state) = setup_test_app(Duration::ZERO).await;

    let response = app.oneshot(get("/api/v1/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["state"], "idle");
    assert!(status.get("last_outcome").is_none());
}

#[tokio::test]
async fn test_toggle_runs_prediction_and_updates_model() {
    let (app, state) = setup_test_app(Duration::ZERO).await;

    let response = app.clone().oneshot(post("/api/v1/toggle")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["state"], "running");

    tokio::time::timeout(Duration::from_secs(5), state.controller.wait_idle())
        .await
        .expect("run did not finish");

    let status = body_json(app.clone().oneshot(get("/api/v1/status")).await.unwrap()).await;
    assert_eq!(status["state"], "idle");
    assert_eq!(status["last_outcome"]["status"], "completed");
    assert_eq!(status["last_outcome"]["result"]["temperature"], 22);
    assert_eq!(status["last_outcome"]["result"]["luminosity"], 19);

    let model = body_json(app.oneshot(get("/api/v1/model")).await.unwrap()).await;
    let objects = model["objects"].as_array().unwrap();
    let attrs = |name: &str| {
        objects
            .iter()
            .find(|o| o["name"] == name)
            .map(|o| o["attributes"].clone())
            .unwrap()
    };
    assert_eq!(attrs("ac")["temperatura"], 22);
    assert_eq!(attrs("light")["intensidad"], 19);
    assert_eq!(attrs("regulator")["encendido"], true);
    assert_eq!(attrs("purifier")["encendido"], false);
    assert_ne!(attrs("result")["executionId"], "");
}

#[tokio::test]
async fn test_second_toggle_stops_run() {
    let (app, state) = setup_test_app(Duration::from_secs(30)).await;

    let first = body_json(app.clone().oneshot(post("/api/v1/toggle")).await.unwrap()).await;
    assert_eq!(first["state"], "running");

    let second = body_json(app.clone().oneshot(post("/api/v1/toggle")).await.unwrap()).await;
    assert_eq!(second["state"], "idle");
    assert!(!state.controller.state().is_running());

    let model = body_json(app.oneshot(get("/api/v1/model")).await.unwrap()).await;
    let ac = model["objects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["name"] == "ac")
        .unwrap()
        .clone();
    assert_eq!(ac["attributes"]["temperatura"], 0);
}

#[tokio::test]
async fn test_toggle_requires_post() {
    let (app, _state) = setup_test_app(Duration::ZERO).await;

    let response = app.oneshot(get("/api/v1/toggle")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app(Duration::ZERO).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("climate_agent_runs_started_total"));
    assert!(text.contains("climate_agent_run_active"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _state) = setup_test_app(Duration::ZERO).await;

    let response = app.oneshot(get("/api/v1/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
