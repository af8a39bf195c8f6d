//! Rule store implementations
//!
//! [`MemoryRuleStore`] keeps the list in process; [`JsonFileRuleStore`]
//! persists `{ "rules": [...] }` to a JSON file. Both notify subscribers
//! after each successful save.

use crate::error::StoreError;
use crate::host::{RuleStore, RulesChanged};
use async_trait::async_trait;
use stash_core::{RuleDocument, RuleRecord};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// In-process rule store
#[derive(Debug)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<RuleRecord>>,
    changes: broadcast::Sender<RulesChanged>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rules: RwLock::new(rules),
            changes,
        }
    }

    pub async fn snapshot(&self) -> Vec<RuleRecord> {
        self.rules.read().await.clone()
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn load_rules(&self) -> Result<Vec<RuleRecord>, StoreError> {
        Ok(self.rules.read().await.clone())
    }

    async fn save_rules(&self, rules: Vec<RuleRecord>) -> Result<(), StoreError> {
        *self.rules.write().await = rules;
        // No subscribers is fine
        let _ = self.changes.send(RulesChanged);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RulesChanged> {
        self.changes.subscribe()
    }
}

/// Rule store backed by a JSON document on disk
#[derive(Debug)]
pub struct JsonFileRuleStore {
    path: PathBuf,
    changes: broadcast::Sender<RulesChanged>,
}

impl JsonFileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            changes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleStore for JsonFileRuleStore {
    async fn load_rules(&self) -> Result<Vec<RuleRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Rule file {} not found, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let document: RuleDocument = serde_json::from_str(&content)?;
        Ok(document.rules)
    }

    async fn save_rules(&self, rules: Vec<RuleRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let count = rules.len();
        let json = serde_json::to_string_pretty(&RuleDocument::new(rules))?;

        // Write beside the target and rename so readers never see half a file
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        info!("Saved {} rule(s) to {}", count, self.path.display());
        let _ = self.changes.send(RulesChanged);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RulesChanged> {
        self.changes.subscribe()
    }
}
