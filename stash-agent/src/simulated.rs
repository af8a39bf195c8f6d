//! In-process stand-in for a browser
//!
//! Tracks each tab's location, local storage and badge so a recorded event
//! trace can be replayed without a real browser. Pages that are not
//! `http(s)` reject scripting the way a browser restricts internal pages.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use stash_core::{is_web_url, IndicatorState};
use stash_orchestrator::{
    HostEvent, IndicatorSink, PageCommand, PageOutput, PageScripting, ScriptError, StorageItem,
    TabDirectory, TabId,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Observable state of one simulated tab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulatedTab {
    pub url: String,
    pub local_storage: BTreeMap<String, String>,
    pub indicator: Option<IndicatorState>,
    /// Locations the page replaced itself with, oldest first
    pub redirects: Vec<String>,
}

/// Summary row for one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabSummary {
    pub tab_id: TabId,
    #[serde(flatten)]
    pub tab: SimulatedTab,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBrowser {
    tabs: Arc<DashMap<TabId, SimulatedTab>>,
    /// Active tab id plus one; zero when none
    active: Arc<AtomicU64>,
}

impl SimulatedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror a host event into the simulated tabs before the orchestrator
    /// sees it
    pub fn observe(&self, event: &HostEvent) {
        match event {
            HostEvent::NavigationStarted { tab_id, url } => {
                self.tabs.entry(*tab_id).or_default().url = url.clone();
            }
            HostEvent::NavigationCompleted { tab_id, .. } => {
                self.tabs.entry(*tab_id).or_default();
            }
            HostEvent::Activated { tab_id } => {
                self.active.store(tab_id.saturating_add(1), Ordering::Relaxed);
            }
            HostEvent::Closed { tab_id } => {
                self.tabs.remove(tab_id);
                if self.active_id() == Some(*tab_id) {
                    self.active.store(0, Ordering::Relaxed);
                }
            }
            HostEvent::Installed { .. } => {}
        }
    }

    pub fn tab(&self, tab_id: TabId) -> Option<SimulatedTab> {
        self.tabs.get(&tab_id).map(|tab| tab.clone())
    }

    /// Every open tab, ordered by id
    pub fn summary(&self) -> Vec<TabSummary> {
        let mut tabs: Vec<_> = self
            .tabs
            .iter()
            .map(|entry| TabSummary {
                tab_id: *entry.key(),
                tab: entry.value().clone(),
            })
            .collect();
        tabs.sort_by_key(|summary| summary.tab_id);
        tabs
    }

    fn active_id(&self) -> Option<TabId> {
        match self.active.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id - 1),
        }
    }
}

#[async_trait]
impl PageScripting for SimulatedBrowser {
    async fn run(&self, tab_id: TabId, command: PageCommand) -> Result<PageOutput, ScriptError> {
        let mut tab = self
            .tabs
            .get_mut(&tab_id)
            .ok_or(ScriptError::TabNotFound { tab_id })?;

        if !is_web_url(&tab.url) {
            return Err(ScriptError::Restricted {
                url: tab.url.clone(),
            });
        }

        trace!("Tab {} runs {:?}", tab_id, command);
        match command {
            PageCommand::SetLocalStorage { key, value } => {
                tab.local_storage.insert(key, value);
                Ok(PageOutput::Done)
            }
            PageCommand::ReplaceLocation { url } => {
                tab.redirects.push(url.clone());
                tab.url = url;
                Ok(PageOutput::Done)
            }
            PageCommand::ReadLocalStorage => Ok(PageOutput::StorageItems(
                tab.local_storage
                    .iter()
                    .map(|(key, value)| StorageItem {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            )),
        }
    }
}

#[async_trait]
impl IndicatorSink for SimulatedBrowser {
    async fn set_indicator(&self, tab_id: TabId, state: IndicatorState) {
        if let Some(mut tab) = self.tabs.get_mut(&tab_id) {
            tab.indicator = Some(state);
        }
    }
}

#[async_trait]
impl TabDirectory for SimulatedBrowser {
    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.tabs.get(&tab_id).map(|tab| tab.url.clone())
    }

    async fn active_tab(&self) -> Option<(TabId, String)> {
        let tab_id = self.active_id()?;
        let url = self.tab_url(tab_id).await?;
        Some((tab_id, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigate(browser: &SimulatedBrowser, tab_id: TabId, url: &str) {
        browser.observe(&HostEvent::NavigationStarted {
            tab_id,
            url: url.to_string(),
        });
    }

    #[tokio::test]
    async fn test_storage_writes_are_visible() {
        let browser = SimulatedBrowser::new();
        navigate(&browser, 1, "https://a.com/");

        browser
            .run(
                1,
                PageCommand::SetLocalStorage {
                    key: "k".to_string(),
                    value: "v".to_string(),
                },
            )
            .await
            .unwrap();

        let output = browser.run(1, PageCommand::ReadLocalStorage).await.unwrap();
        assert_eq!(
            output,
            PageOutput::StorageItems(vec![StorageItem {
                key: "k".to_string(),
                value: "v".to_string()
            }])
        );
    }

    #[tokio::test]
    async fn test_restricted_pages_reject_scripts() {
        let browser = SimulatedBrowser::new();
        navigate(&browser, 1, "chrome://extensions");

        let result = browser.run(1, PageCommand::ReadLocalStorage).await;
        assert!(matches!(result, Err(ScriptError::Restricted { .. })));

        let result = browser.run(2, PageCommand::ReadLocalStorage).await;
        assert_eq!(result, Err(ScriptError::TabNotFound { tab_id: 2 }));
    }

    #[tokio::test]
    async fn test_replace_location_records_redirect() {
        let browser = SimulatedBrowser::new();
        navigate(&browser, 3, "https://a.com");

        browser
            .run(
                3,
                PageCommand::ReplaceLocation {
                    url: "https://b.com".to_string(),
                },
            )
            .await
            .unwrap();

        let tab = browser.tab(3).unwrap();
        assert_eq!(tab.url, "https://b.com");
        assert_eq!(tab.redirects, vec!["https://b.com".to_string()]);
    }

    #[tokio::test]
    async fn test_active_tab_follows_events() {
        let browser = SimulatedBrowser::new();
        navigate(&browser, 4, "https://a.com");
        assert_eq!(browser.active_tab().await, None);

        browser.observe(&HostEvent::Activated { tab_id: 4 });
        assert_eq!(browser.active_tab().await, Some((4, "https://a.com".to_string())));

        browser.observe(&HostEvent::Closed { tab_id: 4 });
        assert_eq!(browser.active_tab().await, None);
        assert!(browser.summary().is_empty());
    }
}
