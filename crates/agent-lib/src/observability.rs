//! Observability infrastructure for prediction runs
//!
//! Provides:
//! - Prometheus metrics (run counts by outcome, run and predictor latency, objects written)
//! - Structured logging of run lifecycle events with tracing

use crate::error::PredictionError;
use crate::models::{InputSnapshot, PredictionResult};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for run and predictor latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    runs_started: IntCounter,
    runs_completed: IntCounter,
    runs_cancelled: IntCounter,
    runs_failed: IntCounterVec,
    run_duration_seconds: Histogram,
    predictor_latency_seconds: Histogram,
    objects_written: IntCounter,
    run_active: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            runs_started: register_int_counter!(
                "climate_agent_runs_started_total",
                "Total number of prediction runs started"
            )
            .expect("Failed to register runs_started"),

            runs_completed: register_int_counter!(
                "climate_agent_runs_completed_total",
                "Total number of prediction runs that updated the model"
            )
            .expect("Failed to register runs_completed"),

            runs_cancelled: register_int_counter!(
                "climate_agent_runs_cancelled_total",
                "Total number of prediction runs stopped before completion"
            )
            .expect("Failed to register runs_cancelled"),

            runs_failed: register_int_counter_vec!(
                "climate_agent_runs_failed_total",
                "Total number of aborted prediction runs by failure kind",
                &["kind"]
            )
            .expect("Failed to register runs_failed"),

            run_duration_seconds: register_histogram!(
                "climate_agent_run_duration_seconds",
                "Wall time of a prediction run from input gathering to write-back",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_duration_seconds"),

            predictor_latency_seconds: register_histogram!(
                "climate_agent_predictor_latency_seconds",
                "Time spent waiting for both predictor processes",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register predictor_latency_seconds"),

            objects_written: register_int_counter!(
                "climate_agent_objects_written_total",
                "Total number of actuator objects updated with predictions"
            )
            .expect("Failed to register objects_written"),

            run_active: register_int_gauge!(
                "climate_agent_run_active",
                "1 while a prediction run is in flight"
            )
            .expect("Failed to register run_active"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_runs_started(&self) {
        self.inner().runs_started.inc();
    }

    pub fn inc_runs_completed(&self) {
        self.inner().runs_completed.inc();
    }

    pub fn inc_runs_cancelled(&self) {
        self.inner().runs_cancelled.inc();
    }

    /// Count an aborted run under its failure kind
    pub fn inc_runs_failed(&self, kind: &str) {
        self.inner().runs_failed.with_label_values(&[kind]).inc();
    }

    pub fn observe_run_duration(&self, duration_secs: f64) {
        self.inner().run_duration_seconds.observe(duration_secs);
    }

    pub fn observe_predictor_latency(&self, duration_secs: f64) {
        self.inner().predictor_latency_seconds.observe(duration_secs);
    }

    pub fn add_objects_written(&self, count: u64) {
        self.inner().objects_written.inc_by(count);
    }

    pub fn set_run_active(&self, active: bool) {
        self.inner().run_active.set(i64::from(active));
    }
}

/// Structured logger for run lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Log a run start after the model reset
    pub fn log_run_started(&self, execution_id: &str, reset_objects: usize) {
        info!(
            event = "run_started",
            host = %self.host,
            execution_id = %execution_id,
            reset_objects = reset_objects,
            "Prediction run started"
        );
    }

    /// Log the inputs read from the model
    pub fn log_inputs(&self, execution_id: &str, inputs: &InputSnapshot) {
        info!(
            event = "inputs_read",
            host = %self.host,
            execution_id = %execution_id,
            prediction_month = inputs.prediction_month,
            desired_temperature = inputs.desired_temperature,
            desired_luminosity = inputs.desired_luminosity,
            current_humidity = inputs.current_humidity,
            current_co2 = inputs.current_co2,
            "Read model inputs"
        );
    }

    pub fn log_prediction_applied(
        &self,
        execution_id: &str,
        result: &PredictionResult,
        objects_written: usize,
    ) {
        info!(
            event = "prediction_applied",
            host = %self.host,
            execution_id = %execution_id,
            temperature = result.temperature,
            luminosity = result.luminosity,
            humidifier_on = result.humidifier_on,
            air_purifier_on = result.air_purifier_on,
            objects_written = objects_written,
            "Model updated with prediction"
        );
    }

    /// Log an aborted run with the cause
    pub fn log_run_aborted(&self, execution_id: &str, err: &PredictionError) {
        error!(
            event = "run_aborted",
            host = %self.host,
            execution_id = %execution_id,
            kind = err.kind(),
            error = %err,
            "Prediction run aborted"
        );
    }

    pub fn log_run_cancelled(&self, execution_id: &str) {
        warn!(
            event = "run_cancelled",
            host = %self.host,
            execution_id = %execution_id,
            "Prediction run cancelled before write-back"
        );
    }

    /// Log the controller returning to idle
    pub fn log_run_stopped(&self, execution_id: &str, requested: bool) {
        info!(
            event = "run_stopped",
            host = %self.host,
            execution_id = %execution_id,
            requested = requested,
            "Execution stopped"
        );
    }

    pub fn log_startup(&self, version: &str, model_objects: usize) {
        info!(
            event = "agent_started",
            host = %self.host,
            agent_version = %version,
            model_objects = model_objects,
            "Climate agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host,
            reason = %reason,
            "Climate agent shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_metrics_creation() {
        // Metrics live in the global Prometheus registry, so every handle shares them
        let metrics = AgentMetrics::new();

        metrics.inc_runs_started();
        metrics.inc_runs_completed();
        metrics.inc_runs_cancelled();
        metrics.inc_runs_failed("format");
        metrics.observe_run_duration(0.5);
        metrics.observe_predictor_latency(0.4);
        metrics.add_objects_written(4);
        metrics.set_run_active(false);

        let _second = AgentMetrics::new();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.host, "test-host");
    }
}
