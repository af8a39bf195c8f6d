use crate::host::TabId;
use dashmap::DashMap;
use serde::Serialize;
use stash_core::{same_page_url, IndicatorState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Where a tab is in its current navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabPhase {
    #[default]
    Idle,
    Loading,
    Complete,
}

/// What the orchestrator remembers about one tab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabState {
    pub phase: TabPhase,
    pub url: Option<String>,
    /// URL this tab was redirected away from; its completion is not injected
    pub redirected_from: Option<String>,
    pub indicator: Option<IndicatorState>,
}

/// Per-tab state keyed by tab id
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    tabs: Arc<DashMap<TabId, TabState>>,
    /// Active tab id plus one; zero when unknown
    active: Arc<AtomicU64>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a navigation
    pub fn enter_loading(&self, tab_id: TabId, url: &str) {
        let mut entry = self.tabs.entry(tab_id).or_default();
        entry.phase = TabPhase::Loading;
        entry.url = Some(url.to_string());
        if is_redirected_from(&entry, url) {
            entry.redirected_from = None;
        }
    }

    /// Remember that `from` was replaced by a redirect
    pub fn mark_redirected(&self, tab_id: TabId, from: &str) {
        let mut entry = self.tabs.entry(tab_id).or_default();
        entry.redirected_from = Some(from.to_string());
    }

    /// Record a finished load. Returns false when the page is the one the
    /// tab was just redirected away from, in which case nothing should be
    /// injected.
    pub fn enter_complete(&self, tab_id: TabId, url: &str) -> bool {
        let mut entry = self.tabs.entry(tab_id).or_default();
        if is_redirected_from(&entry, url) {
            debug!("Tab {} completed {} after redirecting away", tab_id, url);
            entry.redirected_from = None;
            return false;
        }
        entry.phase = TabPhase::Complete;
        entry.url = Some(url.to_string());
        true
    }

    pub fn set_indicator(&self, tab_id: TabId, state: IndicatorState) {
        self.tabs.entry(tab_id).or_default().indicator = Some(state);
    }

    pub fn url_of(&self, tab_id: TabId) -> Option<String> {
        self.tabs.get(&tab_id).and_then(|state| state.url.clone())
    }

    pub fn get(&self, tab_id: TabId) -> Option<TabState> {
        self.tabs.get(&tab_id).map(|state| state.clone())
    }

    pub fn set_active(&self, tab_id: TabId) {
        self.active.store(tab_id.saturating_add(1), Ordering::Relaxed);
    }

    pub fn active(&self) -> Option<TabId> {
        match self.active.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id - 1),
        }
    }

    /// Forget a closed tab
    pub fn remove(&self, tab_id: TabId) -> Option<TabState> {
        if self.active() == Some(tab_id) {
            self.active.store(0, Ordering::Relaxed);
        }
        self.tabs.remove(&tab_id).map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

// Hosts report the same page with or without a trailing slash
fn is_redirected_from(state: &TabState, url: &str) -> bool {
    state
        .redirected_from
        .as_deref()
        .map_or(false, |from| same_page_url(from, url))
}
