//! Predictor output decoding
//!
//! The regression predictor prints `temperature,luminosity` and the
//! classifier prints `humidifier,purifier`. Both are trimmed and joined with
//! [`RESULT_SEPARATOR`] into one combined string before parsing.

use crate::error::PredictionError;
use crate::models::PredictionResult;

/// Separator between tokens of the combined result
pub const RESULT_SEPARATOR: char = ',';

/// Minimum number of tokens a combined result must carry
const EXPECTED_TOKENS: usize = 4;

/// Join the trimmed outputs of both predictors
pub fn combine_outputs(regression: &str, classifier: &str) -> String {
    format!(
        "{}{}{}",
        regression.trim(),
        RESULT_SEPARATOR,
        classifier.trim()
    )
}

/// Decode a combined result into a [`PredictionResult`]
///
/// Requires at least four tokens, extra tokens are ignored. Trailing empty
/// tokens do not count.
pub fn parse_prediction(raw: &str) -> Result<PredictionResult, PredictionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PredictionError::EmptyResult);
    }

    let mut tokens: Vec<&str> = trimmed.split(RESULT_SEPARATOR).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    if tokens.len() < EXPECTED_TOKENS {
        return Err(PredictionError::Format {
            count: tokens.len(),
            raw: trimmed.to_string(),
        });
    }

    Ok(PredictionResult {
        temperature: parse_rounded(tokens[0], trimmed)?,
        luminosity: parse_rounded(tokens[1], trimmed)?,
        humidifier_on: parse_flag(tokens[2], trimmed)?,
        air_purifier_on: parse_flag(tokens[3], trimmed)?,
    })
}

/// Parse a real and round half away from zero, rejecting values outside `i32`
fn parse_rounded(token: &str, raw: &str) -> Result<i64, PredictionError> {
    let token = token.trim();
    let value: f64 = token.parse().map_err(|e: std::num::ParseFloatError| {
        parse_error(token, raw, e.to_string())
    })?;
    if !value.is_finite() {
        return Err(parse_error(token, raw, "value is not finite".to_string()));
    }
    let rounded = value.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return Err(parse_error(token, raw, "value out of range".to_string()));
    }
    Ok(rounded as i64)
}

/// Parse an integer flag, only `1` means on
fn parse_flag(token: &str, raw: &str) -> Result<bool, PredictionError> {
    let token = token.trim();
    let value: i64 = token
        .parse()
        .map_err(|e: std::num::ParseIntError| parse_error(token, raw, e.to_string()))?;
    Ok(value == 1)
}

fn parse_error(token: &str, raw: &str, reason: String) -> PredictionError {
    PredictionError::Parse {
        token: token.to_string(),
        raw: raw.to_string(),
        reason,
    }
}
