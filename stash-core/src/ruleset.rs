//! Rule set editing
//!
//! A [`RuleSet`] is a working copy of the stored rule list. Edits happen in
//! memory; callers persist the result with [`RuleSet::to_records`].

use crate::error::RuleError;
use crate::rule::{Rule, RuleId, RuleKind, RuleRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Key stored on redirect rules, which have no storage key of their own
pub const REDIRECT_KEY_PLACEHOLDER: &str = "redirect";

/// User-supplied fields for creating or editing a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub key: String,
    pub value: String,
}

impl RuleDraft {
    pub fn storage(pattern: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::StorageInjection,
            pattern: pattern.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn redirect(pattern: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Redirect,
            pattern: pattern.into(),
            key: REDIRECT_KEY_PLACEHOLDER.to_string(),
            value: target.into(),
        }
    }

    /// Trim the fields and check them against the rules for the draft's kind
    pub fn validate(&self) -> Result<RuleDraft, RuleError> {
        let pattern = self.pattern.trim().to_string();
        let value = self.value.trim().to_string();

        if pattern.is_empty() {
            return Err(RuleError::validation("pattern", "must not be empty"));
        }

        let key = match self.kind {
            RuleKind::StorageInjection => {
                let key = self.key.trim().to_string();
                if key.is_empty() {
                    return Err(RuleError::validation("key", "must not be empty"));
                }
                key
            }
            RuleKind::Redirect => {
                if !pattern.starts_with("http") {
                    return Err(RuleError::validation(
                        "pattern",
                        "enter a complete URL starting with http:// or https://",
                    ));
                }
                if !value.starts_with("http") {
                    return Err(RuleError::validation(
                        "value",
                        "redirect target must be a complete URL starting with http:// or https://",
                    ));
                }
                REDIRECT_KEY_PLACEHOLDER.to_string()
            }
        };

        Ok(RuleDraft {
            kind: self.kind,
            pattern,
            key,
            value,
        })
    }
}

impl From<&Rule> for RuleDraft {
    fn from(rule: &Rule) -> Self {
        Self {
            kind: rule.kind,
            pattern: rule.pattern.clone(),
            key: rule.key.clone(),
            value: rule.value.clone(),
        }
    }
}

/// Working copy of the rule list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_records(records: &[RuleRecord]) -> Self {
        Self::new(crate::rule::resolve_rules(records))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Rules of one kind, in list order
    pub fn of_kind(&self, kind: RuleKind) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |rule| rule.kind == kind)
    }

    /// Append a new enabled rule with a fresh id
    pub fn add(&mut self, draft: RuleDraft) -> Result<&Rule, RuleError> {
        let draft = draft.validate()?;
        let id = self.fresh_id();
        self.rules.push(Rule {
            id,
            kind: draft.kind,
            pattern: draft.pattern,
            key: draft.key,
            value: draft.value,
            enabled: true,
        });
        Ok(&self.rules[self.rules.len() - 1])
    }

    /// Replace pattern, key and value. Id, kind and `enabled` are kept.
    pub fn update(&mut self, id: RuleId, draft: RuleDraft) -> Result<&Rule, RuleError> {
        let index = self.index_of(id)?;
        let draft = RuleDraft {
            kind: self.rules[index].kind,
            ..draft
        }
        .validate()?;

        let rule = &mut self.rules[index];
        rule.pattern = draft.pattern;
        rule.key = draft.key;
        rule.value = draft.value;
        Ok(&*rule)
    }

    /// Flip `enabled`, returning the new state
    pub fn toggle(&mut self, id: RuleId) -> Result<bool, RuleError> {
        let index = self.index_of(id)?;
        let rule = &mut self.rules[index];
        rule.enabled = !rule.enabled;
        Ok(rule.enabled)
    }

    /// Append a copy of a rule under a fresh id and return it, ready to be
    /// opened for editing via [`RuleDraft::from`]
    pub fn duplicate(&mut self, id: RuleId) -> Result<&Rule, RuleError> {
        let index = self.index_of(id)?;
        let copy = Rule {
            id: self.fresh_id(),
            ..self.rules[index].clone()
        };
        self.rules.push(copy);
        Ok(&self.rules[self.rules.len() - 1])
    }

    pub fn remove(&mut self, id: RuleId) -> Result<Rule, RuleError> {
        let index = self.index_of(id)?;
        Ok(self.rules.remove(index))
    }

    /// Records to hand back to the configuration store
    pub fn to_records(&self) -> Vec<RuleRecord> {
        self.rules.iter().map(RuleRecord::from).collect()
    }

    fn index_of(&self, id: RuleId) -> Result<usize, RuleError> {
        self.rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or(RuleError::NotFound { id })
    }

    /// Current time in milliseconds, bumped past every existing id
    fn fresh_id(&self) -> RuleId {
        let now = Utc::now().timestamp_millis();
        match self.rules.iter().map(|rule| rule.id).max() {
            Some(max) if max >= now => max + 1,
            _ => now,
        }
    }
}
