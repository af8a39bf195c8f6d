//! One-shot schema upgrade for rules stored before `kind` existed

use crate::rule::{RuleKind, RuleRecord};
use tracing::info;

/// Whether any stored rule is missing its `kind`
pub fn needs_migration(records: &[RuleRecord]) -> bool {
    records.iter().any(|record| record.kind.is_none())
}

/// Assign `storageInjection` to every rule without a `kind`.
///
/// Returns `None` when the list is already current, so callers can skip the
/// write entirely. Every other field is left untouched.
pub fn upgrade_rule_kinds(records: &[RuleRecord]) -> Option<Vec<RuleRecord>> {
    if !needs_migration(records) {
        return None;
    }

    let mut migrated = 0usize;
    let upgraded = records
        .iter()
        .map(|record| {
            if record.kind.is_some() {
                return record.clone();
            }
            migrated += 1;
            RuleRecord {
                kind: Some(RuleKind::StorageInjection),
                ..record.clone()
            }
        })
        .collect();

    info!("Migrated {} legacy rule(s) to storageInjection", migrated);
    Some(upgraded)
}
