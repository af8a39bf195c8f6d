//! Error types for rule matching and editing

use crate::rule::RuleId;
use thiserror::Error;

/// Main error type for core operations
#[derive(Debug, Error)]
pub enum StashError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Suggest(#[from] SuggestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A wildcard pattern that could not be turned into a matcher.
///
/// Evaluation never propagates this: a rule carrying a bad pattern simply
/// never matches.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern could not be compiled: {pattern} ({reason})")]
    Compile { pattern: String, reason: String },
}

/// Errors raised while editing a rule set
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule not found: {id}")]
    NotFound { id: RuleId },

    #[error("Input validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },
}

impl RuleError {
    /// Create a validation error with field and reason
    pub fn validation(field: &str, reason: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while building pattern suggestions for a URL
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SuggestError {
    #[error("Cannot suggest patterns for non-web URL: {url}")]
    NotWebUrl { url: String },

    #[error("URL could not be parsed: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },
}
