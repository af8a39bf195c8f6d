//! Host environment collaborators
//!
//! The orchestrator never talks to a browser directly. Everything it needs
//! from the host (rule persistence, running operations inside a page,
//! painting the tab badge, looking up tabs) goes through these traits.

use crate::error::{ScriptError, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stash_core::{IndicatorState, RuleRecord};
use tokio::sync::broadcast;

/// Host-assigned tab identifier
pub type TabId = u64;

/// Notification that the persisted rule list changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesChanged;

/// An operation executed inside a page's context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PageCommand {
    /// `localStorage.setItem(key, value)`
    SetLocalStorage { key: String, value: String },
    /// `location.replace(url)`
    ReplaceLocation { url: String },
    /// Enumerate the page's local storage
    ReadLocalStorage,
}

/// One local storage entry read back from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageItem {
    pub key: String,
    pub value: String,
}

/// What a page command returned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageOutput {
    #[default]
    Done,
    StorageItems(Vec<StorageItem>),
}

/// Why the host reported an install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
}

/// Lifecycle notifications delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    NavigationStarted { tab_id: TabId, url: String },
    NavigationCompleted { tab_id: TabId, url: String },
    Activated { tab_id: TabId },
    Closed { tab_id: TabId },
    Installed { reason: InstallReason },
}

/// Persistent owner of the rule list
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn load_rules(&self) -> Result<Vec<RuleRecord>, StoreError>;

    async fn save_rules(&self, rules: Vec<RuleRecord>) -> Result<(), StoreError>;

    /// Receive a notification after every successful save
    fn subscribe(&self) -> broadcast::Receiver<RulesChanged>;
}

/// Runs small operations inside a tab's page.
///
/// Implementations must fail softly: restricted pages and tabs that went
/// away produce a [`ScriptError`], never a panic.
#[async_trait]
pub trait PageScripting: Send + Sync {
    async fn run(&self, tab_id: TabId, command: PageCommand) -> Result<PageOutput, ScriptError>;
}

/// Per-tab badge painter
#[async_trait]
pub trait IndicatorSink: Send + Sync {
    async fn set_indicator(&self, tab_id: TabId, state: IndicatorState);
}

/// Tab lookups for tabs the orchestrator has not seen navigate yet
#[async_trait]
pub trait TabDirectory: Send + Sync {
    async fn tab_url(&self, tab_id: TabId) -> Option<String>;

    async fn active_tab(&self) -> Option<(TabId, String)>;
}
