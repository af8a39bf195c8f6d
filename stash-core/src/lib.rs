//! Stash Core Library
//!
//! This library provides the rule engine behind autostash: wildcard URL
//! matching, the persisted rule model, rule selection for storage injection
//! and redirects, and the derived per-tab indicator.

/// Wildcard pattern compilation
pub mod pattern;

/// Persisted and resolved rule types
pub mod rule;

/// Pure rule selection over a snapshot
pub mod evaluator;

/// One-shot schema upgrade
pub mod migration;

/// In-memory rule editing
pub mod ruleset;

/// Pattern suggestions for the current page
pub mod suggest;

pub mod config;
pub mod indicator;

/// Error types for rule operations
pub mod error;

pub use config::IndicatorStyle;
pub use error::{PatternError, RuleError, StashError, SuggestError};
pub use evaluator::{
    count_matches, is_web_url, normalize_trailing_slash, partition, same_page_url,
    select_injection_rules, select_redirect_rule, CompiledRules, Partition,
};
pub use indicator::{indicator_for_compiled, indicator_for_url, IndicatorState};
pub use migration::{needs_migration, upgrade_rule_kinds};
pub use pattern::{wildcard_matches, WildcardPattern};
pub use rule::{resolve_rules, Rule, RuleDocument, RuleId, RuleKind, RuleRecord};
pub use ruleset::{RuleDraft, RuleSet, REDIRECT_KEY_PLACEHOLDER};
pub use suggest::suggest_patterns;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, StashError>;
