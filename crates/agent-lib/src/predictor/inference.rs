//! Predictor process launching
//!
//! Runs a predictor script under the configured interpreter with stdout and
//! stderr merged into a single captured text, the way a terminal would show
//! them.

use super::{classifier_args, regression_args, PredictorLauncher, PredictorOutput};
use super::{CLASSIFIER, REGRESSION};
use crate::error::PredictionError;
use crate::models::InputSnapshot;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Maximum time a predictor process may run before it is killed
pub const DEFAULT_PREDICTOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Where and how the predictor scripts are run
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Interpreter used to run both scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Working directory of both processes (the predictors' install location)
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Temperature/luminosity regression script
    #[serde(default = "default_regression_script")]
    pub regression_script: PathBuf,

    /// Humidifier/purifier classifier script
    #[serde(default = "default_classifier_script")]
    pub classifier_script: PathBuf,

    /// Per-process timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("predictors")
}

fn default_regression_script() -> PathBuf {
    PathBuf::from("linearRegressionTempLuz.py")
}

fn default_classifier_script() -> PathBuf {
    PathBuf::from("KNNhumedadPureza.py")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_PREDICTOR_TIMEOUT.as_secs()
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            working_dir: default_working_dir(),
            regression_script: default_regression_script(),
            classifier_script: default_classifier_script(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PredictorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Invocation of the regression predictor for the given inputs
    pub fn regression_invocation(&self, inputs: &InputSnapshot) -> Invocation {
        self.invocation(REGRESSION, &self.regression_script, regression_args(inputs))
    }

    /// Invocation of the classifier predictor for the given inputs
    pub fn classifier_invocation(&self, inputs: &InputSnapshot) -> Invocation {
        self.invocation(CLASSIFIER, &self.classifier_script, classifier_args(inputs))
    }

    fn invocation(
        &self,
        predictor: &'static str,
        script: &std::path::Path,
        args: Vec<String>,
    ) -> Invocation {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(script.to_string_lossy().into_owned());
        full_args.extend(args);

        Invocation {
            predictor,
            program: self.interpreter.clone(),
            args: full_args,
            working_dir: self.working_dir.clone(),
            timeout: self.timeout(),
        }
    }
}

/// A fully resolved predictor process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Which predictor this is, for logs and errors
    pub predictor: &'static str,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

/// Launches predictors as operating-system processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    async fn run_to_completion(
        &self,
        invocation: &Invocation,
    ) -> Result<PredictorOutput, PredictionError> {
        let predictor = invocation.predictor;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PredictionError::Spawn { predictor, source })?;

        let stdout = child.stdout.take().ok_or_else(|| PredictionError::Io {
            predictor,
            source: std::io::Error::other("stdout not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| PredictionError::Io {
            predictor,
            source: std::io::Error::other("stderr not captured"),
        })?;

        let mut out_reader = BufReader::new(stdout);
        let mut err_reader = BufReader::new(stderr);
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_done = false;
        let mut err_done = false;
        let mut merged = String::new();

        // Interleave both streams in arrival order, draining each to EOF
        while !(out_done && err_done) {
            let (read, from_stdout) = tokio::select! {
                read = out_reader.read_until(b'\n', &mut out_buf), if !out_done => (read, true),
                read = err_reader.read_until(b'\n', &mut err_buf), if !err_done => (read, false),
            };
            if from_stdout {
                out_done = push_line(&mut merged, &mut out_buf, read, predictor);
            } else {
                err_done = push_line(&mut merged, &mut err_buf, read, predictor);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|source| PredictionError::Io { predictor, source })?;

        Ok(PredictorOutput {
            exit_code: status.code(),
            output: merged,
        })
    }
}

/// Append a raw line decoded leniently, returns true once the stream is finished
///
/// Predictors may print in a legacy code page, so invalid UTF-8 is replaced
/// rather than ending the capture.
fn push_line(
    merged: &mut String,
    buf: &mut Vec<u8>,
    read: std::io::Result<usize>,
    predictor: &'static str,
) -> bool {
    match read {
        Ok(0) => true,
        Ok(_) => {
            let line = String::from_utf8_lossy(buf);
            merged.push_str(line.trim_end_matches(&['\n', '\r'][..]));
            merged.push('\n');
            buf.clear();
            false
        }
        Err(e) => {
            warn!(predictor = predictor, error = %e, "Stopped reading predictor output");
            true
        }
    }
}

#[async_trait]
impl PredictorLauncher for ProcessLauncher {
    async fn run(&self, invocation: &Invocation) -> Result<PredictorOutput, PredictionError> {
        let start = Instant::now();
        debug!(
            predictor = invocation.predictor,
            program = %invocation.program,
            args = ?invocation.args,
            working_dir = %invocation.working_dir.display(),
            "Launching predictor"
        );

        let result = tokio::time::timeout(invocation.timeout, self.run_to_completion(invocation))
            .await
            .map_err(|_| PredictionError::PredictorTimeout {
                predictor: invocation.predictor,
                timeout: invocation.timeout,
            })?;

        if let Ok(output) = &result {
            debug!(
                predictor = invocation.predictor,
                exit_code = ?output.exit_code,
                elapsed_ms = start.elapsed().as_millis(),
                "Predictor finished"
            );
        }
        result
    }
}
