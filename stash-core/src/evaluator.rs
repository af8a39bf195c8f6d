//! Rule Evaluator
//!
//! Pure functions over a rule snapshot and a URL. Nothing here performs I/O
//! or reads shared state: callers pass in the rules they last loaded.
//!
//! Only `http://` and `https://` URLs are ever matched. Browser-internal
//! pages, `file://` URLs and the like never match any rule.
//!
//! [`CompiledRules`] compiles every storage pattern of a snapshot once; the
//! free functions are shorthands that compile for a single query.

use crate::pattern::WildcardPattern;
use crate::rule::{Rule, RuleKind};
use serde::Serialize;
use tracing::{debug, warn};

/// Whether `url` is a web page rules may act on
pub fn is_web_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Strip surrounding whitespace and a single trailing `/`
pub fn normalize_trailing_slash(url: &str) -> &str {
    let url = url.trim();
    url.strip_suffix('/').unwrap_or(url)
}

/// Exact URL comparison used by redirect rules.
///
/// Both sides lose one trailing `/`; after that one side may still carry a
/// single extra `/`. So `https://a.com/x`, `https://a.com/x/` and
/// `https://a.com/x//` all name the same page, `https://a.com/x///` does not.
pub fn same_page_url(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_trailing_slash(a), normalize_trailing_slash(b));
    a == b || a.strip_suffix('/') == Some(b) || b.strip_suffix('/') == Some(a)
}

/// A rule snapshot with each storage pattern compiled once
#[derive(Debug, Clone)]
pub struct CompiledRules<'a> {
    rules: &'a [Rule],
    /// Parallel to `rules`; `None` for redirects and broken patterns
    patterns: Vec<Option<WildcardPattern>>,
}

impl<'a> CompiledRules<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        let patterns = rules
            .iter()
            .map(|rule| match rule.kind {
                RuleKind::Redirect => None,
                RuleKind::StorageInjection => match WildcardPattern::compile(&rule.pattern) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        warn!(rule_id = rule.id, "Rule with invalid pattern skipped: {}", e);
                        None
                    }
                },
            })
            .collect();

        Self { rules, patterns }
    }

    pub fn rules(&self) -> &'a [Rule] {
        self.rules
    }

    /// Kind-appropriate match test for the rule at `index`, ignoring `enabled`
    fn is_match(&self, index: usize, url: &str) -> bool {
        let rule = &self.rules[index];
        match rule.kind {
            RuleKind::Redirect => same_page_url(&rule.pattern, url),
            RuleKind::StorageInjection => self.patterns[index]
                .as_ref()
                .map_or(false, |pattern| pattern.matches(url)),
        }
    }

    fn enabled_matching<'s>(&'s self, url: &'s str) -> impl Iterator<Item = &'a Rule> + 's {
        let web = is_web_url(url);
        self.rules
            .iter()
            .enumerate()
            .filter(move |(index, rule)| web && rule.enabled && self.is_match(*index, url))
            .map(|(_, rule)| rule)
    }

    /// Enabled storage injection rules whose pattern covers `url`, in list order
    pub fn select_injection_rules(&self, url: &str) -> Vec<&'a Rule> {
        self.enabled_matching(url)
            .filter(|rule| rule.kind == RuleKind::StorageInjection)
            .collect()
    }

    /// The first enabled redirect rule for `url`, skipping rules that would
    /// send the page back to itself
    pub fn select_redirect_rule(&self, url: &str) -> Option<&'a Rule> {
        self.enabled_matching(url)
            .filter(|rule| rule.kind == RuleKind::Redirect)
            .find(|rule| {
                if same_page_url(&rule.value, url) {
                    debug!(rule_id = rule.id, url = url, "Skipping self-redirect");
                    false
                } else {
                    true
                }
            })
    }

    /// Number of enabled rules applying to `url`, for the tab indicator.
    ///
    /// Kept independent of the selectors: a redirect rule pointing back at
    /// its own URL still counts here.
    pub fn count_matches(&self, url: &str) -> usize {
        self.enabled_matching(url).count()
    }

    /// Split the rules of `kind` into active, enabled-but-inactive and
    /// disabled groups. With no current URL nothing is active.
    pub fn partition(&self, current_url: Option<&str>, kind: RuleKind) -> Partition<'a> {
        let mut groups = Partition::default();
        let current_url = current_url.filter(|url| is_web_url(url));

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.kind != kind {
                continue;
            }
            if !rule.enabled {
                groups.disabled.push(rule);
            } else if current_url.map_or(false, |url| self.is_match(index, url)) {
                groups.active.push(rule);
            } else {
                groups.enabled_inactive.push(rule);
            }
        }

        groups
    }
}

pub fn select_injection_rules<'a>(rules: &'a [Rule], url: &str) -> Vec<&'a Rule> {
    CompiledRules::new(rules).select_injection_rules(url)
}

pub fn select_redirect_rule<'a>(rules: &'a [Rule], url: &str) -> Option<&'a Rule> {
    CompiledRules::new(rules).select_redirect_rule(url)
}

pub fn count_matches(rules: &[Rule], url: &str) -> usize {
    CompiledRules::new(rules).count_matches(url)
}

pub fn partition<'a>(rules: &'a [Rule], current_url: Option<&str>, kind: RuleKind) -> Partition<'a> {
    CompiledRules::new(rules).partition(current_url, kind)
}

/// Rules of one kind split by how they relate to the current page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition<'a> {
    /// Enabled and matching the current page
    pub active: Vec<&'a Rule>,
    /// Enabled but not matching the current page
    pub enabled_inactive: Vec<&'a Rule>,
    /// Switched off
    pub disabled: Vec<&'a Rule>,
}

impl<'a> Partition<'a> {
    pub fn len(&self) -> usize {
        self.active.len() + self.enabled_inactive.len() + self.disabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
