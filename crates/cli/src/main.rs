//! Room Climate Predictor CLI
//!
//! A command-line tool for toggling prediction runs on the climate agent
//! and inspecting its state, object model and health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, model, run, settings};

/// Room Climate Predictor CLI
#[derive(Parser)]
#[command(name = "climatectl")]
#[command(author, version, about = "CLI for the Room Climate Predictor agent", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via CLIMATECTL_API_URL env var or the config file)
    #[arg(long, env = "CLIMATECTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a prediction run, or stop the one in progress
    Toggle {
        /// Wait for a started run to finish and show its outcome
        #[arg(long, short)]
        wait: bool,

        /// Maximum time to wait, in seconds
        #[arg(long, default_value_t = 120, requires = "wait")]
        timeout: u64,
    },

    /// Show the run state and the last run's outcome
    Status,

    /// Show the agent's object model
    Model {
        /// Only show objects of this class (e.g. AireAcondicionado)
        #[arg(long, short)]
        class: Option<String>,
    },

    /// Show agent health and readiness
    Health,

    /// Show or change persistent CLI settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the stored settings
    Show,

    /// Store default settings
    Set {
        /// Default agent URL
        #[arg(long)]
        api_url: Option<String>,

        /// Default output format
        #[arg(long)]
        default_format: Option<output::OutputFormat>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format);
    let api_url = config.resolve_api_url(cli.api_url.clone());
    let connect = || client::ApiClient::new(&api_url);

    // Execute command
    match cli.command {
        Commands::Toggle { wait, timeout } => {
            run::toggle(&connect()?, wait, timeout, format).await?;
        }
        Commands::Status => {
            run::status(&connect()?, format).await?;
        }
        Commands::Model { class } => {
            model::show_model(&connect()?, class, format).await?;
        }
        Commands::Health => {
            health::show_health(&connect()?, format).await?;
        }
        // Settings work without a reachable agent
        Commands::Config(ConfigCommands::Show) => {
            settings::show(&config, format)?;
        }
        Commands::Config(ConfigCommands::Set {
            api_url,
            default_format,
        }) => {
            settings::set(config, api_url, default_format)?;
        }
    }

    Ok(())
}
