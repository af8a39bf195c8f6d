//! Tab indicator derivation

use crate::config::IndicatorStyle;
use crate::evaluator::{is_web_url, CompiledRules};
use crate::rule::Rule;
use serde::{Deserialize, Serialize};

/// What the host should show on a tab's badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorState {
    /// Decimal match count, or empty when nothing applies
    pub text: String,
    pub background: String,
    pub foreground: String,
}

impl IndicatorState {
    pub fn cleared(style: &IndicatorStyle) -> Self {
        Self::for_count(0, style)
    }

    pub fn for_count(count: usize, style: &IndicatorStyle) -> Self {
        let text = if count > 0 { count.to_string() } else { String::new() };
        Self {
            text,
            background: style.background.clone(),
            foreground: style.foreground.clone(),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.text.is_empty()
    }
}

/// Indicator for a tab showing `url`; cleared for unknown or non-web pages
pub fn indicator_for_url(rules: &[Rule], url: Option<&str>, style: &IndicatorStyle) -> IndicatorState {
    indicator_for_compiled(&CompiledRules::new(rules), url, style)
}

pub fn indicator_for_compiled(
    rules: &CompiledRules<'_>,
    url: Option<&str>,
    style: &IndicatorStyle,
) -> IndicatorState {
    match url {
        Some(url) if is_web_url(url) => IndicatorState::for_count(rules.count_matches(url), style),
        _ => IndicatorState::cleared(style),
    }
}
