//! Core data models for a prediction run

use serde::{Deserialize, Serialize};

/// Inputs read from the object model at the start of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Month the prediction is for (1-12, not validated)
    pub prediction_month: i64,
    pub desired_temperature: f64,
    pub desired_luminosity: f64,
    pub current_humidity: f64,
    pub current_co2: f64,
}

/// Decoded predictor output applied to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub temperature: i64,
    pub luminosity: i64,
    pub humidifier_on: bool,
    pub air_purifier_on: bool,
}

/// Lifecycle state of the run controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed { result: PredictionResult },
    Aborted { kind: String, reason: String },
    Cancelled,
}

/// Terminal record of a single activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub execution_id: String,
    pub started_at: i64,
    pub finished_at: i64,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed { .. })
    }
}

/// Snapshot of the controller exposed to hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusReport {
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<RunOutcome>,
}
