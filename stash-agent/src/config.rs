//! Agent configuration
//!
//! Sources, lowest priority first: built-in defaults, the optional JSON file
//! given with `--config`, `AUTOSTASH_*` environment variables, then command
//! line flags.

use crate::error::{AgentError, Result};
use crate::Args;
use serde::{Deserialize, Serialize};
use stash_core::IndicatorStyle;
use stash_orchestrator::logging::levels;
use stash_orchestrator::LoggingConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_RULES_PATH: &str = "AUTOSTASH_RULES_PATH";
pub const ENV_LOG_LEVEL: &str = "AUTOSTASH_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "AUTOSTASH_LOG_JSON";
pub const ENV_BADGE_BACKGROUND: &str = "AUTOSTASH_BADGE_BACKGROUND";
pub const ENV_BADGE_FOREGROUND: &str = "AUTOSTASH_BADGE_FOREGROUND";

const DEFAULT_RULES_PATH: &str = "autostash-rules.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// JSON document holding `{ "rules": [...] }`
    pub rules_path: PathBuf,

    /// Badge colours
    pub indicator: IndicatorStyle,

    pub logging: LoggingConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            indicator: IndicatorStyle::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        self.indicator
            .validate()
            .map_err(|e| AgentError::Config(format!("validation failed: {}", e)))?;

        if !levels::is_valid_level(&self.logging.level) {
            return Err(AgentError::Config(format!(
                "validation failed: log level must be one of {:?}, got {:?}",
                levels::valid_levels(),
                self.logging.level
            )));
        }

        if self.rules_path.as_os_str().is_empty() {
            return Err(AgentError::Config(
                "validation failed: rules path is empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load configuration using the process environment
pub fn load_config(args: &Args) -> Result<AgentConfig> {
    load_config_with(args, |name| std::env::var(name).ok())
}

/// Load configuration with `env` standing in for environment lookups
pub fn load_config_with<F>(args: &Args, env: F) -> Result<AgentConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => AgentConfig::default(),
    };

    apply_env(&mut config, env)?;
    apply_args(&mut config, args);

    config.validate()?;
    debug!("Loaded agent configuration: {:?}", config);
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<AgentConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| AgentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|e| {
        AgentError::Config(format!("Invalid config file {}: {}", path.display(), e))
    })
}

fn apply_env<F>(config: &mut AgentConfig, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = env(ENV_RULES_PATH) {
        config.rules_path = PathBuf::from(path);
    }
    if let Some(level) = env(ENV_LOG_LEVEL) {
        config.logging.level = level.to_lowercase();
    }
    if let Some(json) = env(ENV_LOG_JSON) {
        config.logging.json_format = parse_bool(&json)
            .ok_or_else(|| AgentError::Config(format!("Invalid {} value: {}", ENV_LOG_JSON, json)))?;
    }
    if let Some(colour) = env(ENV_BADGE_BACKGROUND) {
        config.indicator.background = colour;
    }
    if let Some(colour) = env(ENV_BADGE_FOREGROUND) {
        config.indicator.foreground = colour;
    }
    Ok(())
}

fn apply_args(config: &mut AgentConfig, args: &Args) {
    if let Some(path) = &args.rules {
        config.rules_path = path.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }
    if args.log_json {
        config.logging.json_format = true;
    }
    if let Some(colour) = &args.badge_background {
        config.indicator.background = colour.clone();
    }
    if let Some(colour) = &args.badge_foreground {
        config.indicator.foreground = colour.clone();
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
