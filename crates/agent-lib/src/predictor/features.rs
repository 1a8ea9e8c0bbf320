//! Predictor argument formatting
//!
//! Arguments are positional strings. Reals always carry exactly one decimal
//! digit with a `.` separator; Rust formatting never consults the locale.

use crate::models::InputSnapshot;

/// Format a real with one decimal digit
pub fn format_real(value: f64) -> String {
    format!("{:.1}", value)
}

/// Arguments for the regression predictor: month, desired temperature, desired luminosity
pub fn regression_args(inputs: &InputSnapshot) -> Vec<String> {
    vec![
        inputs.prediction_month.to_string(),
        format_real(inputs.desired_temperature),
        format_real(inputs.desired_luminosity),
    ]
}

/// Arguments for the classifier predictor: humidity, CO2
pub fn classifier_args(inputs: &InputSnapshot) -> Vec<String> {
    vec![
        format_real(inputs.current_humidity),
        format_real(inputs.current_co2),
    ]
}
