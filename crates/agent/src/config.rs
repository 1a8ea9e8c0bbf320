//! Agent configuration

use agent_lib::predictor::PredictorConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name attached to structured log events
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// API server port for the toggle action, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON snapshot of the object model, loaded at startup and saved on shutdown
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Predictor processes (`CLIMATE_AGENT_PREDICTOR__INTERPRETER`, ...)
    #[serde(default)]
    pub predictor: PredictorConfig,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host_name: default_host_name(),
            api_port: default_api_port(),
            model_path: default_model_path(),
            predictor: PredictorConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `CLIMATE_AGENT_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CLIMATE_AGENT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }
}
