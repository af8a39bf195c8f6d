//! Rule model
//!
//! [`RuleRecord`] is the shape kept by the configuration store, where older
//! installs may have left `kind` or `enabled` unset. [`Rule`] is the resolved
//! form every evaluator function works on.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Rule identifier (creation time in milliseconds)
pub type RuleId = i64;

/// What a rule does when it applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// Write `key = value` into the page's local storage
    #[default]
    #[serde(rename = "storageInjection", alias = "localStorage")]
    StorageInjection,

    /// Replace the page location with `value`
    #[serde(rename = "redirect")]
    Redirect,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::StorageInjection => "storageInjection",
            RuleKind::Redirect => "redirect",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "storageinjection" | "localstorage" | "storage" => Ok(RuleKind::StorageInjection),
            "redirect" => Ok(RuleKind::Redirect),
            other => Err(format!("unknown rule kind: {}", other)),
        }
    }
}

/// A rule exactly as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,

    /// Missing on rules written before redirects existed. Older builds
    /// stored it under `type`.
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,

    #[serde(default)]
    pub pattern: String,

    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl RuleRecord {
    /// Resolve defaults: missing kind is a storage injection, missing
    /// `enabled` means enabled.
    pub fn to_rule(&self) -> Rule {
        Rule {
            id: self.id,
            kind: self.kind.unwrap_or_default(),
            pattern: self.pattern.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}

impl From<&Rule> for RuleRecord {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id,
            kind: Some(rule.kind),
            pattern: rule.pattern.clone(),
            key: rule.key.clone(),
            value: rule.value.clone(),
            enabled: Some(rule.enabled),
        }
    }
}

/// A rule with every default resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub kind: RuleKind,
    pub pattern: String,
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

/// Resolve a list of stored records, keeping their order
pub fn resolve_rules(records: &[RuleRecord]) -> Vec<Rule> {
    records.iter().map(RuleRecord::to_rule).collect()
}

/// The persisted document: `{ "rules": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default, deserialize_with = "deserialize_records")]
    pub rules: Vec<RuleRecord>,
}

/// Read each entry on its own so one unreadable record does not hide the rest
fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<RuleRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let records = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<RuleRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable rule at index {}: {}", index, e);
                None
            }
        })
        .collect();
    Ok(records)
}

impl RuleDocument {
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        Self { rules }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
