//! Run lifecycle CLI commands

use anyhow::Result;
use colored::Colorize;
use std::time::{Duration, Instant};
use tabled::Tabled;

use crate::client::{ApiClient, RunOutcome, RunStatusReport, ToggleResponse};
use crate::output::{
    color_status, color_switch, format_elapsed_ms, format_timestamp_ms, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Row for the key/value status table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl FieldRow {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Toggle the agent's run and optionally wait for it to finish
pub async fn toggle(
    client: &ApiClient,
    wait: bool,
    timeout_secs: u64,
    format: OutputFormat,
) -> Result<()> {
    let response: ToggleResponse = client.post("api/v1/toggle").await?;

    if !(wait && response.state == "running") {
        return match format {
            OutputFormat::Json => print_json(&response),
            OutputFormat::Table => {
                match response.state.as_str() {
                    "running" => print_success("Prediction run started"),
                    _ => print_success("Prediction run stopped"),
                }
                Ok(())
            }
        };
    }

    if format == OutputFormat::Table {
        print_info("Prediction run started, waiting for it to finish...");
    }

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        let report: RunStatusReport = client.get("api/v1/status").await?;
        if !report.is_running() {
            return print_report(&report, format);
        }
        if Instant::now() >= deadline {
            anyhow::bail!(
                "Run still in progress after {}s, check `climatectl status`",
                timeout_secs
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Show the current state and the last run's outcome
pub async fn status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report: RunStatusReport = client.get("api/v1/status").await?;
    print_report(&report, format)
}

fn print_report(report: &RunStatusReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    println!("{}", "Prediction Run".bold());
    println!("{}", "=".repeat(40));
    println!("State: {}", color_status(&report.state));
    println!();

    match &report.last_outcome {
        Some(outcome) => print_table(&outcome_rows(outcome)),
        None => print_warning("No run has finished yet"),
    }
    Ok(())
}

fn outcome_rows(outcome: &RunOutcome) -> Vec<FieldRow> {
    let mut rows = vec![
        FieldRow::new("Execution", outcome.execution_id.clone()),
        FieldRow::new("Outcome", color_status(&outcome.status)),
        FieldRow::new("Started", format_timestamp_ms(outcome.started_at)),
        FieldRow::new(
            "Duration",
            format_elapsed_ms(outcome.started_at, outcome.finished_at),
        ),
    ];

    if let Some(result) = &outcome.result {
        rows.push(FieldRow::new("Air conditioner", format!("{} °C", result.temperature)));
        rows.push(FieldRow::new("Lights", result.luminosity.to_string()));
        rows.push(FieldRow::new("Humidity regulators", color_switch(result.humidifier_on)));
        rows.push(FieldRow::new("Air purifiers", color_switch(result.air_purifier_on)));
    }
    if let Some(kind) = &outcome.kind {
        rows.push(FieldRow::new("Failure", kind.red().to_string()));
    }
    if let Some(reason) = &outcome.reason {
        rows.push(FieldRow::new("Reason", reason.clone()));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PredictionResult;

    #[test]
    fn test_outcome_rows_for_completed_run() {
        colored::control::set_override(false);
        let outcome = RunOutcome {
            execution_id: "1700000000000".to_string(),
            started_at: 1_700_000_000_000,
            finished_at: 1_700_000_000_420,
            status: "completed".to_string(),
            result: Some(PredictionResult {
                temperature: 22,
                luminosity: 19,
                humidifier_on: true,
                air_purifier_on: false,
            }),
            kind: None,
            reason: None,
        };

        let rows = outcome_rows(&outcome);
        let value = |field: &str| rows.iter().find(|r| r.field == field).map(|r| r.value.clone());

        assert_eq!(value("Duration").as_deref(), Some("420ms"));
        assert_eq!(value("Air conditioner").as_deref(), Some("22 °C"));
        assert_eq!(value("Humidity regulators").as_deref(), Some("on"));
        assert_eq!(value("Air purifiers").as_deref(), Some("off"));
        assert!(value("Reason").is_none());
    }

    #[test]
    fn test_outcome_rows_for_aborted_run() {
        colored::control::set_override(false);
        let outcome = RunOutcome {
            execution_id: "1".to_string(),
            started_at: 1,
            finished_at: 2,
            status: "aborted".to_string(),
            result: None,
            kind: Some("predictor_failed".to_string()),
            reason: Some("predictor process failed".to_string()),
        };

        let rows = outcome_rows(&outcome);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.field != "Lights"));
    }
}
