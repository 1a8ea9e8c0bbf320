//! External predictor invocation
//!
//! The regression and classifier models run as separate interpreter
//! processes. This module formats their arguments, launches them and decodes
//! their combined text output.

mod features;
mod inference;
mod output;

pub use features::{classifier_args, format_real, regression_args};
pub use inference::{Invocation, PredictorConfig, ProcessLauncher, DEFAULT_PREDICTOR_TIMEOUT};
pub use output::{combine_outputs, parse_prediction, RESULT_SEPARATOR};

use crate::error::PredictionError;
use async_trait::async_trait;

/// Label of the temperature/luminosity regression predictor
pub const REGRESSION: &str = "regression";

/// Label of the humidifier/purifier classifier predictor
pub const CLASSIFIER: &str = "classifier";

/// Exit status and merged stdout/stderr text of one predictor process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorOutput {
    /// Process exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

impl PredictorOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running a predictor invocation to completion
#[async_trait]
pub trait PredictorLauncher: Send + Sync {
    /// Run the process and capture its merged output
    async fn run(&self, invocation: &Invocation) -> Result<PredictorOutput, PredictionError>;
}
