//! Error types for the navigation orchestrator

use crate::host::TabId;
use thiserror::Error;

/// Main error type for orchestrator operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Logging error: {0}")]
    Logging(String),
}

/// Reading or writing the configuration store failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Rule store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A page operation was rejected or failed inside the page
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Cannot script restricted page: {url}")]
    Restricted { url: String },

    #[error("Tab not found: {tab_id}")]
    TabNotFound { tab_id: TabId },

    #[error("Page script failed: {0}")]
    Failed(String),
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
