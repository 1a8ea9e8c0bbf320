//! Persistent CLI settings

use anyhow::Result;

use crate::config::Config;
use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Show the stored settings and where they live
pub fn show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Table => {
            print_info(&format!("Config file: {}", Config::config_path()?.display()));
            println!(
                "api_url:        {}",
                config.api_url.as_deref().unwrap_or("(default)")
            );
            println!(
                "default_format: {}",
                config.default_format.as_deref().unwrap_or("(default)")
            );
            Ok(())
        }
    }
}

/// Update the stored settings
pub fn set(
    mut config: Config,
    api_url: Option<String>,
    default_format: Option<OutputFormat>,
) -> Result<()> {
    if let Some(url) = api_url {
        url::Url::parse(&url)?;
        config.api_url = Some(url);
    }
    if let Some(format) = default_format {
        let name = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        config.default_format = Some(name.to_string());
    }

    let path = config.save()?;
    print_success(&format!("Saved settings to {}", path.display()));
    Ok(())
}
