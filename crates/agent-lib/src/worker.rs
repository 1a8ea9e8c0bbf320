//! Prediction worker
//!
//! Executes exactly one input -> predict -> write cycle against the object
//! model. Input gathering fails closed: any missing object or attribute
//! aborts the cycle before a predictor is launched, and nothing is written
//! unless both predictors succeed and their output decodes cleanly.

use crate::error::PredictionError;
use crate::health::{components, HealthRegistry};
use crate::model::{ObjectModel, RoomModel};
use crate::models::{InputSnapshot, PredictionResult, RunOutcome, RunStatus};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::predictor::{combine_outputs, parse_prediction, PredictorConfig, PredictorLauncher};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Unit of work run on the controller's background task
pub struct PredictionWorker {
    model: Arc<dyn ObjectModel>,
    launcher: Arc<dyn PredictorLauncher>,
    config: PredictorConfig,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: AgentMetrics,
    execution_id: String,
}

impl PredictionWorker {
    pub fn new(
        model: Arc<dyn ObjectModel>,
        launcher: Arc<dyn PredictorLauncher>,
        config: PredictorConfig,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            model,
            launcher,
            config,
            health: HealthRegistry::new(),
            logger: StructuredLogger::new("local"),
            metrics: AgentMetrics::new(),
            execution_id: execution_id.into(),
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Run one cycle and report how it ended
    ///
    /// Errors never escape: they are logged, counted and turned into the
    /// returned outcome.
    pub async fn run(self, cancel: CancellationToken) -> RunOutcome {
        let started_at = chrono::Utc::now().timestamp_millis();
        let start = Instant::now();

        let status = match self.run_cycle(&cancel).await {
            Ok(result) => {
                info!(execution_id = %self.execution_id, "Prediction run completed");
                self.metrics.inc_runs_completed();
                self.health.set_healthy(components::PREDICTORS).await;
                self.health.set_healthy(components::MODEL).await;
                RunStatus::Completed { result }
            }
            Err(PredictionError::Cancelled) => {
                self.logger.log_run_cancelled(&self.execution_id);
                self.metrics.inc_runs_cancelled();
                RunStatus::Cancelled
            }
            Err(e) => {
                self.logger.log_run_aborted(&self.execution_id, &e);
                self.metrics.inc_runs_failed(e.kind());
                let component = if e.is_predictor_fault() {
                    components::PREDICTORS
                } else {
                    components::MODEL
                };
                self.health.set_degraded(component, e.to_string()).await;
                RunStatus::Aborted {
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }
            }
        };

        self.metrics
            .observe_run_duration(start.elapsed().as_secs_f64());

        RunOutcome {
            execution_id: self.execution_id,
            started_at,
            finished_at: chrono::Utc::now().timestamp_millis(),
            status,
        }
    }

    /// The cycle itself, with cancellation observed at phase boundaries
    pub async fn run_cycle(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PredictionResult, PredictionError> {
        let inputs = self.gather_inputs()?;
        self.logger.log_inputs(&self.execution_id, &inputs);

        if cancel.is_cancelled() {
            return Err(PredictionError::Cancelled);
        }

        let raw = self.invoke_predictors(&inputs, cancel).await?;
        let result = parse_prediction(&raw)?;
        debug!(
            temperature = result.temperature,
            luminosity = result.luminosity,
            humidifier_on = result.humidifier_on,
            air_purifier_on = result.air_purifier_on,
            "Parsed prediction"
        );

        if cancel.is_cancelled() {
            return Err(PredictionError::Cancelled);
        }

        let written = self.apply(&result)?;
        self.logger
            .log_prediction_applied(&self.execution_id, &result, written);
        Ok(result)
    }

    /// Read every input, aborting on the first missing one
    pub fn gather_inputs(&self) -> Result<InputSnapshot, PredictionError> {
        let model = self.model.as_ref();
        model.update_derived_values();

        let room = model.room_configuration()?;
        let desired_temperature = model.desired_temperature(&room)?;
        let desired_luminosity = model.desired_luminosity(&room)?;
        let prediction_month = model.prediction_month()?;
        let current_humidity = model.current_humidity()?;
        let current_co2 = model.current_co2()?;

        Ok(InputSnapshot {
            prediction_month,
            desired_temperature,
            desired_luminosity,
            current_humidity,
            current_co2,
        })
    }

    /// Run both predictors concurrently and combine their output
    async fn invoke_predictors(
        &self,
        inputs: &InputSnapshot,
        cancel: &CancellationToken,
    ) -> Result<String, PredictionError> {
        let regression = self.config.regression_invocation(inputs);
        let classifier = self.config.classifier_invocation(inputs);
        let start = Instant::now();

        let (regression_out, classifier_out) = tokio::select! {
            outputs = async {
                tokio::join!(
                    self.launcher.run(&regression),
                    self.launcher.run(&classifier)
                )
            } => outputs,
            _ = cancel.cancelled() => return Err(PredictionError::Cancelled),
        };

        self.metrics
            .observe_predictor_latency(start.elapsed().as_secs_f64());

        let regression_out = regression_out?;
        let classifier_out = classifier_out?;

        if !(regression_out.success() && classifier_out.success()) {
            return Err(PredictionError::PredictorFailed {
                regression_code: regression_out.exit_code,
                classifier_code: classifier_out.exit_code,
                regression_output: regression_out.output,
                classifier_output: classifier_out.output,
            });
        }

        let combined = combine_outputs(&regression_out.output, &classifier_out.output);
        info!(execution_id = %self.execution_id, combined = %combined, "Combined predictor result");
        Ok(combined)
    }

    /// Write a result to every matching object, then refresh derived values
    ///
    /// A rejected write leaves every actuator as it was.
    pub fn apply(&self, result: &PredictionResult) -> Result<usize, PredictionError> {
        let model = self.model.as_ref();
        let written = model.apply_prediction(result)?;
        model.update_derived_values();

        self.metrics.add_objects_written(written as u64);
        if written == 0 {
            warn!(execution_id = %self.execution_id, "Prediction applied but no actuator objects exist");
        }
        Ok(written)
    }
}
