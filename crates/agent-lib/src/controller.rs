//! Run controller
//!
//! Owns the start/stop lifecycle of prediction runs. A single slot holds the
//! in-flight worker; `toggle` starts a run when the slot is empty and stops
//! the current one otherwise. Every run stops itself when its cycle ends, so
//! one activation performs exactly one cycle.

use crate::health::{components, HealthRegistry};
use crate::model::{ObjectModel, RoomModel};
use crate::models::{RunOutcome, RunState, RunStatus, RunStatusReport};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::predictor::{PredictorConfig, PredictorLauncher, ProcessLauncher};
use crate::worker::PredictionWorker;
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Worker occupying the controller's slot
struct ActiveRun {
    run_id: u64,
    execution_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    model: Arc<dyn ObjectModel>,
    launcher: Arc<dyn PredictorLauncher>,
    config: PredictorConfig,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: AgentMetrics,
    /// Serializes toggle/stop so a join never races a new start
    control: tokio::sync::Mutex<()>,
    slot: Mutex<Option<ActiveRun>>,
    next_run_id: AtomicU64,
    state_tx: watch::Sender<RunState>,
    last_outcome: Mutex<Option<RunOutcome>>,
}

impl Shared {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Worker completion path: release the slot if it still belongs to this run
    fn finish(&self, run_id: u64, outcome: RunOutcome) {
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(outcome);

        // Slot and published state change together under the slot lock.
        // An explicit stop already owns the slot and goes idle after joining.
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|run| run.run_id == run_id) {
            if let Some(run) = slot.take() {
                run.cancel.cancel();
                self.go_idle(&run.execution_id, false);
            }
        }
    }

    fn go_idle(&self, execution_id: &str, requested: bool) {
        self.state_tx.send_replace(RunState::Idle);
        self.metrics.set_run_active(false);
        self.logger.log_run_stopped(execution_id, requested);
    }
}

/// Start/stop controller for prediction runs
#[derive(Clone)]
pub struct RunController {
    shared: Arc<Shared>,
}

impl RunController {
    pub fn new(
        model: Arc<dyn ObjectModel>,
        launcher: Arc<dyn PredictorLauncher>,
        config: PredictorConfig,
    ) -> Self {
        RunControllerBuilder::new(model)
            .launcher(launcher)
            .config(config)
            .build()
    }

    pub fn builder(model: Arc<dyn ObjectModel>) -> RunControllerBuilder {
        RunControllerBuilder::new(model)
    }

    pub fn state(&self) -> RunState {
        *self.shared.state_tx.borrow()
    }

    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.shared
            .last_outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn status(&self) -> RunStatusReport {
        RunStatusReport {
            state: self.state(),
            last_outcome: self.last_outcome(),
        }
    }

    /// Start a run when idle, stop the current one when running
    pub async fn toggle(&self) -> Result<RunState> {
        let _control = self.shared.control.lock().await;
        let occupied = self.shared.lock_slot().is_some();
        if occupied {
            Ok(self.stop_locked().await)
        } else {
            self.start_locked()
        }
    }

    /// Cancel the current run and wait for it to terminate
    pub async fn stop(&self) -> RunState {
        let _control = self.shared.control.lock().await;
        self.stop_locked().await
    }

    /// Wait until no run is in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.state_tx.subscribe();
        // The sender lives in `shared`, which outlives this borrow
        let _ = rx.wait_for(|state| !state.is_running()).await;
    }

    fn start_locked(&self) -> Result<RunState> {
        let shared = &self.shared;
        let execution_id = chrono::Utc::now().timestamp_millis().to_string();

        let reset = match shared.model.reset_algorithm_results(&execution_id) {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Error initializing model");
                0
            }
        };

        let run_id = shared.next_run_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let worker = PredictionWorker::new(
            shared.model.clone(),
            shared.launcher.clone(),
            shared.config.clone(),
            execution_id.clone(),
        )
        .with_health(shared.health.clone())
        .with_logger(shared.logger.clone());

        // The worker waits for the gate so its completion always finds the slot filled
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let task_shared = shared.clone();
        let task_cancel = cancel.clone();
        let task_execution_id = execution_id.clone();
        let handle = tokio::spawn(async move {
            let _ = gate_rx.await;
            let outcome = match tokio::spawn(worker.run(task_cancel)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Error running prediction worker");
                    task_shared
                        .health
                        .set_unhealthy(components::CONTROLLER, e.to_string())
                        .await;
                    let now = chrono::Utc::now().timestamp_millis();
                    RunOutcome {
                        execution_id: task_execution_id,
                        started_at: now,
                        finished_at: now,
                        status: RunStatus::Aborted {
                            kind: "worker_panic".to_string(),
                            reason: e.to_string(),
                        },
                    }
                }
            };
            task_shared.finish(run_id, outcome);
        });

        {
            let mut slot = shared.lock_slot();
            *slot = Some(ActiveRun {
                run_id,
                execution_id: execution_id.clone(),
                cancel,
                handle,
            });
            shared.state_tx.send_replace(RunState::Running);
        }
        shared.metrics.inc_runs_started();
        shared.metrics.set_run_active(true);
        shared.logger.log_run_started(&execution_id, reset);

        let _ = gate_tx.send(());
        Ok(RunState::Running)
    }

    async fn stop_locked(&self) -> RunState {
        let taken = self.shared.lock_slot().take();
        let Some(run) = taken else {
            return self.state();
        };

        info!(execution_id = %run.execution_id, "Stopping...");
        run.cancel.cancel();
        if let Err(e) = run.handle.await {
            error!(error = %e, "Could not stop execution successfully");
        }

        // Idle regardless of how the join ended
        self.shared.go_idle(&run.execution_id, true);
        RunState::Idle
    }
}

/// Builder for creating a run controller
pub struct RunControllerBuilder {
    model: Arc<dyn ObjectModel>,
    launcher: Option<Arc<dyn PredictorLauncher>>,
    config: PredictorConfig,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
}

impl RunControllerBuilder {
    pub fn new(model: Arc<dyn ObjectModel>) -> Self {
        Self {
            model,
            launcher: None,
            config: PredictorConfig::default(),
            health: None,
            logger: None,
        }
    }

    /// Set the predictor launcher (defaults to real processes)
    pub fn launcher(mut self, launcher: Arc<dyn PredictorLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> RunController {
        let (state_tx, _) = watch::channel(RunState::Idle);
        RunController {
            shared: Arc::new(Shared {
                model: self.model,
                launcher: self
                    .launcher
                    .unwrap_or_else(|| Arc::new(ProcessLauncher::new())),
                config: self.config,
                health: self.health.unwrap_or_default(),
                logger: self
                    .logger
                    .unwrap_or_else(|| StructuredLogger::new("local")),
                metrics: AgentMetrics::new(),
                control: tokio::sync::Mutex::new(()),
                slot: Mutex::new(None),
                next_run_id: AtomicU64::new(1),
                state_tx,
                last_outcome: Mutex::new(None),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictionError;
    use crate::model::{schema, AttrValue, InMemoryModel};
    use crate::predictor::{Invocation, PredictorOutput, REGRESSION};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio_test::assert_ok;

    /// Launcher that counts calls and optionally blocks until cancelled
    struct CountingLauncher {
        calls: AtomicUsize,
        delay: Duration,
        regression_exit: i32,
    }

    impl CountingLauncher {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                regression_exit: 0,
            }
        }
    }

    #[async_trait]
    impl PredictorLauncher for CountingLauncher {
        async fn run(&self, invocation: &Invocation) -> Result<PredictorOutput, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let (exit_code, output) = if invocation.predictor == REGRESSION {
                (self.regression_exit, "21.7,19.2")
            } else {
                (0, "1,0")
            };
            Ok(PredictorOutput {
                exit_code: Some(exit_code),
                output: output.to_string(),
            })
        }
    }

    fn room_model() -> Arc<InMemoryModel> {
        let model = InMemoryModel::new();
        let add = |obj: &str, class: &str, attrs: &[(&str, AttrValue)]| {
            model.insert(obj, class);
            for (name, value) in attrs {
                model.set_attribute(obj, name, value.clone()).unwrap();
            }
        };
        add(
            "room",
            schema::ROOM,
            &[
                (schema::DESIRED_TEMPERATURE, AttrValue::Real(22.5)),
                (schema::DESIRED_LUMINOSITY, AttrValue::Real(18.0)),
            ],
        );
        add("clock", schema::TIME, &[(schema::MONTH, AttrValue::Integer(6))]);
        add("hum", schema::HUMIDITY_SENSOR, &[(schema::SENSOR_VALUE, AttrValue::Real(40.2))]);
        add("co2", schema::CO2_SENSOR, &[(schema::SENSOR_VALUE, AttrValue::Real(410.7))]);
        add(
            "ac",
            schema::AIR_CONDITIONER,
            &[(schema::AIR_CONDITIONER_TEMPERATURE, AttrValue::Integer(0))],
        );
        add("light", schema::LIGHT, &[(schema::LIGHT_INTENSITY, AttrValue::Integer(0))]);
        add(
            "result",
            schema::ALGORITHM_RESULT,
            &[(schema::RESULT_TEMPERATURE, AttrValue::Integer(25))],
        );
        Arc::new(model)
    }

    fn controller(model: Arc<InMemoryModel>, launcher: Arc<CountingLauncher>) -> RunController {
        RunController::new(model, launcher, PredictorConfig::default())
    }

    #[tokio::test]
    async fn test_run_stops_itself_after_one_cycle() {
        let model = room_model();
        let launcher = Arc::new(CountingLauncher::new(Duration::ZERO));
        let controller = controller(model.clone(), launcher.clone());

        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(assert_ok!(controller.toggle().await), RunState::Running);

        tokio::time::timeout(Duration::from_secs(5), controller.wait_idle())
            .await
            .expect("run did not stop itself");

        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(model.integer_attribute("ac", schema::AIR_CONDITIONER_TEMPERATURE), Some(22));
        assert_eq!(model.integer_attribute("light", schema::LIGHT_INTENSITY), Some(19));

        let outcome = controller.last_outcome().unwrap();
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_reset_marks_results_stale() {
        let model = room_model();
        let launcher = Arc::new(CountingLauncher::new(Duration::from_secs(30)));
        let controller = controller(model.clone(), launcher);

        controller.toggle().await.unwrap();

        let execution_id = model
            .attribute("result", schema::EXECUTION_ID)
            .expect("execution id written");
        assert!(matches!(execution_id, AttrValue::String(ref s) if s.parse::<i64>().is_ok()));
        assert_eq!(model.integer_attribute("result", schema::RESULT_TEMPERATURE), Some(0));
        assert_eq!(model.integer_attribute("result", schema::RESULT_LUMINOSITY), Some(0));

        controller.stop().await;
    }

    #[tokio::test]
    async fn test_second_toggle_stops_without_new_worker() {
        let model = room_model();
        let before_ac = model.integer_attribute("ac", schema::AIR_CONDITIONER_TEMPERATURE);
        let launcher = Arc::new(CountingLauncher::new(Duration::from_secs(30)));
        let controller = controller(model.clone(), launcher.clone());

        assert_eq!(controller.toggle().await.unwrap(), RunState::Running);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.toggle().await.unwrap(), RunState::Idle);

        assert_eq!(controller.state(), RunState::Idle);
        // One worker launched both predictors, no second worker followed
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            model.integer_attribute("ac", schema::AIR_CONDITIONER_TEMPERATURE),
            before_ac
        );
        assert_eq!(
            controller.last_outcome().map(|o| o.status),
            Some(RunStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_immediate_double_toggle() {
        let model = room_model();
        let launcher = Arc::new(CountingLauncher::new(Duration::from_secs(30)));
        let controller = controller(model, launcher.clone());

        controller.toggle().await.unwrap();
        let state = controller.toggle().await.unwrap();

        assert_eq!(state, RunState::Idle);
        assert_eq!(controller.state(), RunState::Idle);
        assert!(launcher.calls.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let controller = controller(room_model(), Arc::new(CountingLauncher::new(Duration::ZERO)));
        assert_eq!(controller.stop().await, RunState::Idle);
        assert!(controller.last_outcome().is_none());
    }

    #[tokio::test]
    async fn test_failed_run_returns_to_idle_and_can_retry() {
        let model = room_model();
        let mut launcher = CountingLauncher::new(Duration::ZERO);
        launcher.regression_exit = 1;
        let launcher = Arc::new(launcher);
        let controller = controller(model.clone(), launcher.clone());

        controller.toggle().await.unwrap();
        controller.wait_idle().await;

        let outcome = controller.last_outcome().unwrap();
        assert!(matches!(outcome.status, RunStatus::Aborted { ref kind, .. } if kind == "predictor_failed"));
        assert_eq!(model.integer_attribute("ac", schema::AIR_CONDITIONER_TEMPERATURE), Some(0));

        // A fresh activation runs again
        controller.toggle().await.unwrap();
        controller.wait_idle().await;
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_missing_inputs_still_self_stop() {
        let model = Arc::new(InMemoryModel::new());
        let launcher = Arc::new(CountingLauncher::new(Duration::ZERO));
        let controller = controller(model, launcher.clone());

        controller.toggle().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), controller.wait_idle())
            .await
            .expect("run did not stop itself");

        assert_eq!(launcher.calls.load(Ordering::SeqCst), 0);
        let report = controller.status();
        assert_eq!(report.state, RunState::Idle);
        assert!(matches!(
            report.last_outcome.map(|o| o.status),
            Some(RunStatus::Aborted { .. })
        ));
    }
}
