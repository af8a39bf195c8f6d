//! Wildcard URL patterns
//!
//! A pattern is literal text where `*` stands for any run of characters,
//! including an empty one. Everything else, regex metacharacters included,
//! matches itself. A pattern must cover the whole URL.

use crate::error::PatternError;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// The only metacharacter understood in a pattern
pub const WILDCARD: char = '*';

/// Upper bound on the compiled size of a single pattern
const DEFAULT_SIZE_LIMIT: usize = 1 << 20;

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compile a pattern. Surrounding whitespace is ignored.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Self::compile_with_size_limit(pattern, DEFAULT_SIZE_LIMIT)
    }

    /// Compile a pattern, failing when the compiled matcher would exceed
    /// `size_limit` bytes.
    pub fn compile_with_size_limit(pattern: &str, size_limit: usize) -> Result<Self, PatternError> {
        let source = pattern.trim();

        // Literal runs between wildcards are escaped one by one
        let body = source
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = RegexBuilder::new(&format!("^(?s:{})$", body))
            .size_limit(size_limit)
            .build()
            .map_err(|e| PatternError::Compile {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The trimmed pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern contains at least one wildcard
    pub fn has_wildcard(&self) -> bool {
        self.source.contains(WILDCARD)
    }

    /// Check whether the entire `url` is covered by the pattern
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

/// Compile `pattern` and test `url` against it.
///
/// A pattern that fails to compile never matches.
pub fn wildcard_matches(pattern: &str, url: &str) -> bool {
    match WildcardPattern::compile(pattern) {
        Ok(compiled) => compiled.matches(url),
        Err(e) => {
            warn!("Rule with invalid pattern skipped: {}", e);
            false
        }
    }
}
