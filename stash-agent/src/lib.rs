//! Stash Agent
//!
//! Command line host for the autostash engine. Replays recorded browser
//! event traces through the navigation orchestrator against a simulated
//! browser, and answers one-off questions about the stored rules.

use clap::{Parser, Subcommand};
use stash_core::RuleKind;
use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod error;
pub mod simulated;


pub use config::{load_config, load_config_with, AgentConfig};
pub use error::{AgentError, Result};
pub use simulated::SimulatedBrowser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Rule document to read and migrate
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Badge background colour, #RRGGBB
    #[arg(long)]
    pub badge_background: Option<String>,

    /// Badge text colour, #RRGGBB
    #[arg(long)]
    pub badge_foreground: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replay a JSON-lines trace of host events
    Replay {
        #[arg(long)]
        events: PathBuf,
    },

    /// Show how the stored rules relate to a URL
    Inspect {
        #[arg(long)]
        url: String,

        #[arg(long, default_value_t = RuleKind::StorageInjection)]
        kind: RuleKind,
    },

    /// Suggest patterns for a new rule targeting a URL
    Suggest {
        #[arg(long)]
        url: String,

        #[arg(long, default_value_t = RuleKind::StorageInjection)]
        kind: RuleKind,
    },
}

/// Run the selected command and render its report as pretty JSON
pub async fn run_agent(args: &Args, config: &AgentConfig) -> Result<String> {
    tracing::debug!("Running {:?} with rules at {}", args.command, config.rules_path.display());

    let rendered = match &args.command {
        Command::Replay { events } => {
            let report = commands::replay(config, events).await?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Inspect { url, kind } => {
            let report = commands::inspect(config, url, *kind).await?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Suggest { url, kind } => {
            let report = commands::suggest(url, *kind)?;
            serde_json::to_string_pretty(&report)?
        }
    };

    Ok(rendered)
}
