//! Agent health commands

use anyhow::Result;
use colored::Colorize;
use reqwest::StatusCode;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{
    color_status, format_timestamp_ms, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

#[derive(Serialize)]
struct HealthReport {
    health: HealthResponse,
    readiness: ReadinessResponse,
}

/// Show liveness and readiness of the agent
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let unavailable = [StatusCode::SERVICE_UNAVAILABLE];
    let health: HealthResponse = client.get_accepting("healthz", &unavailable).await?;
    let readiness: ReadinessResponse = client.get_accepting("readyz", &unavailable).await?;

    if format == OutputFormat::Json {
        return print_json(&HealthReport { health, readiness });
    }

    println!("{}", "Agent Health".bold());
    println!("{}", "=".repeat(40));
    println!("Status: {}", color_status(&health.status));
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&component.status),
            message: component.message.clone().unwrap_or_else(|| "-".to_string()),
            last_check: format_timestamp_ms(component.last_check_timestamp * 1000),
        })
        .collect();
    print_table(&rows);
    println!();

    if readiness.ready {
        print_success("Agent is ready");
    } else {
        print_warning(&format!(
            "Agent is not ready: {}",
            readiness.reason.as_deref().unwrap_or("unknown reason")
        ));
    }
    Ok(())
}
