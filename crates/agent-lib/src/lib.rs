//! Agent library for room climate prediction
//!
//! This crate provides the core functionality for:
//! - Reading prediction inputs from the object model
//! - Running the external regression and classifier predictors
//! - Writing predictions back to the actuator objects
//! - The toggle/stop lifecycle of prediction runs
//! - Health checks and observability

pub mod controller;
pub mod error;
pub mod health;
pub mod model;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod worker;

pub use controller::{RunController, RunControllerBuilder};
pub use error::{ModelError, PredictionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use model::{AttrValue, InMemoryModel, ModelSnapshot, ObjectModel, RoomModel};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use predictor::{PredictorConfig, PredictorLauncher, ProcessLauncher};
pub use worker::PredictionWorker;
