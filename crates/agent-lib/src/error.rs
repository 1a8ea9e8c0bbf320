//! Error types for a prediction run
//!
//! Every variant maps to one way a cycle can abort. None of them are fatal
//! to the host: the worker logs the error, records it in the run outcome and
//! stops itself.

use std::time::Duration;

/// Failure raised by an [`ObjectModel`](crate::model::ObjectModel) write
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("object '{0}' does not exist")]
    UnknownObject(String),
    #[error("attribute '{attribute}' cannot be written on '{object}': {reason}")]
    WriteRejected {
        object: String,
        attribute: String,
        reason: String,
    },
}

/// Reason a prediction cycle was aborted
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("no object of class '{class}' found")]
    MissingObject { class: &'static str },

    #[error("could not read '{attribute}' of {class}")]
    MissingAttribute {
        class: &'static str,
        attribute: &'static str,
    },

    #[error("failed to start {predictor} predictor: {source}")]
    Spawn {
        predictor: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running {predictor} predictor: {source}")]
    Io {
        predictor: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "predictors failed with exit codes: {}, {}, outputs: {regression_output}, {classifier_output}",
        display_code(.regression_code),
        display_code(.classifier_code)
    )]
    PredictorFailed {
        regression_code: Option<i32>,
        classifier_code: Option<i32>,
        regression_output: String,
        classifier_output: String,
    },

    #[error("{predictor} predictor did not finish within {timeout:?}")]
    PredictorTimeout {
        predictor: &'static str,
        timeout: Duration,
    },

    #[error("result is empty")]
    EmptyResult,

    #[error("invalid result format (expected 4 values, got {count}): {raw}")]
    Format { count: usize, raw: String },

    #[error("could not parse '{token}' from result string '{raw}': {reason}")]
    Parse {
        token: String,
        raw: String,
        reason: String,
    },

    #[error("model update failed: {0}")]
    Model(#[from] ModelError),

    #[error("run cancelled")]
    Cancelled,
}

impl PredictionError {
    /// Short machine-friendly label used for metrics and run outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::MissingObject { .. } | PredictionError::MissingAttribute { .. } => {
                "missing_input"
            }
            PredictionError::Spawn { .. } | PredictionError::Io { .. } => "spawn",
            PredictionError::PredictorFailed { .. } => "predictor_failed",
            PredictionError::PredictorTimeout { .. } => "predictor_timeout",
            PredictionError::EmptyResult | PredictionError::Format { .. } => "format",
            PredictionError::Parse { .. } => "parse",
            PredictionError::Model(_) => "model",
            PredictionError::Cancelled => "cancelled",
        }
    }

    /// Whether the failure came from the predictor processes rather than the model
    pub fn is_predictor_fault(&self) -> bool {
        matches!(
            self,
            PredictionError::Spawn { .. }
                | PredictionError::Io { .. }
                | PredictionError::PredictorFailed { .. }
                | PredictionError::PredictorTimeout { .. }
                | PredictionError::EmptyResult
                | PredictionError::Format { .. }
                | PredictionError::Parse { .. }
        )
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictor_failed_message_lists_both_codes() {
        let err = PredictionError::PredictorFailed {
            regression_code: Some(1),
            classifier_code: None,
            regression_output: "Traceback".to_string(),
            classifier_output: "1,0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit codes: 1, signal"));
        assert!(msg.contains("Traceback"));
        assert_eq!(err.kind(), "predictor_failed");
        assert!(err.is_predictor_fault());
    }

    #[test]
    fn test_missing_input_is_not_predictor_fault() {
        let err = PredictionError::MissingObject { class: "Tiempo" };
        assert_eq!(err.kind(), "missing_input");
        assert!(!err.is_predictor_fault());
        assert_eq!(err.to_string(), "no object of class 'Tiempo' found");
    }
}
