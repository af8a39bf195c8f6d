//! Navigation Orchestrator
//!
//! Applies rules at the right point of each tab's lifecycle:
//!
//! - navigation start: redirect rules (at most one redirect per navigation)
//! - navigation complete: storage injection rules, in list order
//! - activation and rule changes: indicator only, never side effects
//! - install/update: one-shot schema upgrade of the stored rules
//!
//! Store failures abort the event being handled and are logged; page
//! script failures are swallowed per rule.

use crate::error::{Result, ScriptError};
use crate::host::{
    HostEvent, IndicatorSink, InstallReason, PageCommand, PageOutput, PageScripting, RuleStore,
    StorageItem, TabDirectory, TabId,
};
use crate::log_tab_event;
use crate::tabs::{TabRegistry, TabState};
use serde::Serialize;
use stash_core::{
    indicator_for_compiled, indicator_for_url, is_web_url, resolve_rules, upgrade_rule_kinds,
    CompiledRules, IndicatorState, IndicatorStyle, Rule, RuleId,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

/// What handling one host event did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// Internal or file page; only the indicator was cleared
    NonWebPage,
    /// A redirect rule fired
    Redirected { rule_id: RuleId, target: String },
    /// A redirect rule matched but the page refused the location change
    RedirectFailed { rule_id: RuleId, reason: String },
    /// Storage rules were applied; `failed` writes were swallowed
    Injected { applied: usize, failed: usize },
    /// The completed page had just been redirected away from
    InjectionSkipped,
    /// Only the indicator was recomputed
    IndicatorRefreshed,
    /// Legacy rules were upgraded and saved
    Migrated { migrated: usize },
    TabClosed,
    NoAction,
    /// The configuration store could not be reached
    Aborted { reason: String },
}

/// Drives rule application for every tab
pub struct NavigationOrchestrator {
    store: Arc<dyn RuleStore>,
    scripting: Arc<dyn PageScripting>,
    indicator: Arc<dyn IndicatorSink>,
    directory: Arc<dyn TabDirectory>,
    registry: TabRegistry,
    style: IndicatorStyle,
}

impl NavigationOrchestrator {
    pub fn new(
        store: Arc<dyn RuleStore>,
        scripting: Arc<dyn PageScripting>,
        indicator: Arc<dyn IndicatorSink>,
        directory: Arc<dyn TabDirectory>,
    ) -> Self {
        Self {
            store,
            scripting,
            indicator,
            directory,
            registry: TabRegistry::new(),
            style: IndicatorStyle::default(),
        }
    }

    pub fn with_indicator_style(mut self, style: IndicatorStyle) -> Self {
        self.style = style;
        self
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn tab_state(&self, tab_id: TabId) -> Option<TabState> {
        self.registry.get(tab_id)
    }

    /// Handle a single host event
    pub async fn handle(&self, event: HostEvent) -> EventOutcome {
        let result = match &event {
            HostEvent::NavigationStarted { tab_id, url } => {
                self.on_navigation_started(*tab_id, url).await
            }
            HostEvent::NavigationCompleted { tab_id, url } => {
                self.on_navigation_completed(*tab_id, url).await
            }
            HostEvent::Activated { tab_id } => self.on_activated(*tab_id).await,
            HostEvent::Closed { tab_id } => Ok(self.on_closed(*tab_id)),
            HostEvent::Installed { reason } => self.on_installed(*reason).await,
        };

        result.unwrap_or_else(|e| {
            warn!("Aborted handling of {:?}: {}", event, e);
            EventOutcome::Aborted {
                reason: e.to_string(),
            }
        })
    }

    /// Refresh the indicator of the active tab after the rule list changed
    pub async fn handle_rules_changed(&self) -> EventOutcome {
        let target = match self.registry.active() {
            Some(tab_id) => Some((tab_id, self.tab_url(tab_id).await)),
            None => self
                .directory
                .active_tab()
                .await
                .map(|(tab_id, url)| (tab_id, Some(url))),
        };

        let Some((tab_id, url)) = target else {
            debug!("Rules changed with no active tab");
            return EventOutcome::NoAction;
        };

        self.refresh_indicator(tab_id, url.as_deref())
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to refresh indicator after rule change: {}", e);
                EventOutcome::Aborted {
                    reason: e.to_string(),
                }
            })
    }

    /// Process host events and store notifications until the host closes
    /// its event channel
    pub async fn run(&self, mut events: mpsc::Receiver<HostEvent>) {
        let mut changes = self.store.subscribe();
        let mut watching_changes = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let outcome = self.handle(event).await;
                        debug!("Event handled: {:?}", outcome);
                    }
                    None => break,
                },
                change = changes.recv(), if watching_changes => match change {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        self.handle_rules_changed().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Rule store closed its change channel");
                        watching_changes = false;
                    }
                },
            }
        }

        info!("Host event channel closed, orchestrator stopping");
    }

    /// Run the one-shot schema upgrade. Returns how many rules were changed.
    pub async fn migrate(&self) -> Result<usize> {
        let records = self.store.load_rules().await?;
        match upgrade_rule_kinds(&records) {
            Some(upgraded) => {
                let migrated = records.iter().filter(|r| r.kind.is_none()).count();
                self.store.save_rules(upgraded).await?;
                info!("Migration complete, {} rule(s) updated", migrated);
                Ok(migrated)
            }
            None => {
                info!("No migration needed");
                Ok(0)
            }
        }
    }

    /// Local storage entries of the page in `tab_id`, for building new
    /// rules. Empty for non-web pages.
    pub async fn storage_suggestions(
        &self,
        tab_id: TabId,
    ) -> std::result::Result<Vec<StorageItem>, ScriptError> {
        let url = self.tab_url(tab_id).await;
        if !url.as_deref().map_or(false, is_web_url) {
            return Ok(Vec::new());
        }

        match self.scripting.run(tab_id, PageCommand::ReadLocalStorage).await? {
            PageOutput::StorageItems(items) => Ok(items),
            PageOutput::Done => Ok(Vec::new()),
        }
    }

    async fn on_navigation_started(&self, tab_id: TabId, url: &str) -> Result<EventOutcome> {
        self.registry.enter_loading(tab_id, url);

        if !is_web_url(url) {
            self.publish_indicator(tab_id, IndicatorState::cleared(&self.style))
                .await;
            return Ok(EventOutcome::NonWebPage);
        }

        let rules = self.load_rules().await?;
        let compiled = CompiledRules::new(&rules);
        self.publish_indicator(tab_id, indicator_for_compiled(&compiled, Some(url), &self.style))
            .await;

        let Some(rule) = compiled.select_redirect_rule(url) else {
            return Ok(EventOutcome::NoAction);
        };

        let command = PageCommand::ReplaceLocation {
            url: rule.value.clone(),
        };
        match self.scripting.run(tab_id, command).await {
            Ok(_) => {
                self.registry.mark_redirected(tab_id, url);
                log_tab_event!(
                    info,
                    tab_id,
                    "redirect",
                    rule_id = rule.id,
                    from = url,
                    to = rule.value.as_str()
                );
                Ok(EventOutcome::Redirected {
                    rule_id: rule.id,
                    target: rule.value.clone(),
                })
            }
            Err(e) => {
                // Navigating away quickly makes this fail, which is fine
                debug!("Redirect for tab {} not applied: {}", tab_id, e);
                Ok(EventOutcome::RedirectFailed {
                    rule_id: rule.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn on_navigation_completed(&self, tab_id: TabId, url: &str) -> Result<EventOutcome> {
        if !self.registry.enter_complete(tab_id, url) {
            return Ok(EventOutcome::InjectionSkipped);
        }

        if !is_web_url(url) {
            self.publish_indicator(tab_id, IndicatorState::cleared(&self.style))
                .await;
            return Ok(EventOutcome::NonWebPage);
        }

        let rules = self.load_rules().await?;
        let compiled = CompiledRules::new(&rules);
        self.publish_indicator(tab_id, indicator_for_compiled(&compiled, Some(url), &self.style))
            .await;

        let mut applied = 0;
        let mut failed = 0;
        for rule in compiled.select_injection_rules(url) {
            let command = PageCommand::SetLocalStorage {
                key: rule.key.clone(),
                value: rule.value.clone(),
            };
            match self.scripting.run(tab_id, command).await {
                Ok(_) => {
                    applied += 1;
                    debug!("Injected rule {} into tab {}", rule.id, tab_id);
                }
                Err(e) => {
                    failed += 1;
                    debug!("Injection of rule {} into tab {} failed: {}", rule.id, tab_id, e);
                }
            }
        }

        if applied + failed > 0 {
            log_tab_event!(info, tab_id, "inject", applied = applied, failed = failed);
        }
        Ok(EventOutcome::Injected { applied, failed })
    }

    async fn on_activated(&self, tab_id: TabId) -> Result<EventOutcome> {
        self.registry.set_active(tab_id);
        let url = self.tab_url(tab_id).await;
        self.refresh_indicator(tab_id, url.as_deref()).await
    }

    fn on_closed(&self, tab_id: TabId) -> EventOutcome {
        self.registry.remove(tab_id);
        log_tab_event!(debug, tab_id, "closed");
        EventOutcome::TabClosed
    }

    async fn on_installed(&self, reason: InstallReason) -> Result<EventOutcome> {
        info!("Install event received: {:?}", reason);
        match reason {
            InstallReason::Install | InstallReason::Update => {
                let migrated = self.migrate().await?;
                if migrated > 0 {
                    Ok(EventOutcome::Migrated { migrated })
                } else {
                    Ok(EventOutcome::NoAction)
                }
            }
            InstallReason::BrowserUpdate => Ok(EventOutcome::NoAction),
        }
    }

    async fn refresh_indicator(&self, tab_id: TabId, url: Option<&str>) -> Result<EventOutcome> {
        let state = match url {
            Some(url) if is_web_url(url) => {
                let rules = self.load_rules().await?;
                indicator_for_url(&rules, Some(url), &self.style)
            }
            _ => IndicatorState::cleared(&self.style),
        };
        self.publish_indicator(tab_id, state).await;
        Ok(EventOutcome::IndicatorRefreshed)
    }

    async fn publish_indicator(&self, tab_id: TabId, state: IndicatorState) {
        self.registry.set_indicator(tab_id, state.clone());
        self.indicator.set_indicator(tab_id, state).await;
    }

    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        match self.registry.url_of(tab_id) {
            Some(url) => Some(url),
            None => self.directory.tab_url(tab_id).await,
        }
    }

    async fn load_rules(&self) -> Result<Vec<Rule>> {
        let records = self.store.load_rules().await?;
        Ok(resolve_rules(&records))
    }
}
