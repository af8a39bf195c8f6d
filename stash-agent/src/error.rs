use stash_core::{StashError, SuggestError};
use stash_orchestrator::{OrchestratorError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the agent commands
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid event on line {line}: {source}")]
    EventParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] StashError),

    #[error(transparent)]
    Suggest(#[from] SuggestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
