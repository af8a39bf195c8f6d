//! Agent subcommands
//!
//! Each command returns a serializable report; the binary prints it as JSON.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::simulated::{SimulatedBrowser, TabSummary};
use serde::Serialize;
use stash_core::{resolve_rules, suggest_patterns, CompiledRules, Rule, RuleKind};
use stash_orchestrator::{
    EventOutcome, HostEvent, JsonFileRuleStore, NavigationOrchestrator, RuleStore,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Redirects followed automatically for a single trace event
pub const MAX_REDIRECT_CHAIN: usize = 8;

/// One handled event and what the orchestrator did with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayStep {
    pub event: HostEvent,
    pub outcome: EventOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Legacy rules upgraded before the trace started
    pub migrated: usize,
    pub steps: Vec<ReplayStep>,
    /// Tabs still open at the end of the trace
    pub tabs: Vec<TabSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub url: String,
    pub kind: RuleKind,
    /// Badge count for the page, across both kinds
    pub match_count: usize,
    /// Where a navigation to this page would be sent
    pub redirect_target: Option<String>,
    pub active: Vec<Rule>,
    pub enabled_inactive: Vec<Rule>,
    pub disabled: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestReport {
    pub url: String,
    pub kind: RuleKind,
    pub patterns: Vec<String>,
}

/// Parse a JSON-lines event trace. Blank lines and `#` comments are skipped.
pub fn parse_events(content: &str) -> Result<Vec<HostEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| AgentError::EventParse {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Replay a recorded trace against the simulated browser
pub async fn replay(config: &AgentConfig, events_path: &Path) -> Result<ReplayReport> {
    let content = tokio::fs::read_to_string(events_path)
        .await
        .map_err(|source| AgentError::Io {
            path: events_path.to_path_buf(),
            source,
        })?;
    let events = parse_events(&content)?;

    let store = Arc::new(JsonFileRuleStore::new(&config.rules_path));
    let browser = Arc::new(SimulatedBrowser::new());
    let orchestrator =
        NavigationOrchestrator::new(store, browser.clone(), browser.clone(), browser.clone())
            .with_indicator_style(config.indicator.clone());

    let migrated = orchestrator.migrate().await?;
    info!("Replaying {} event(s) from {}", events.len(), events_path.display());

    let mut steps = Vec::with_capacity(events.len());
    for event in events {
        replay_event(&orchestrator, &browser, event, &mut steps).await;
    }

    Ok(ReplayReport {
        migrated,
        steps,
        tabs: browser.summary(),
    })
}

/// Feed one event through, then follow any redirect it caused the way a
/// browser would load the new location
async fn replay_event(
    orchestrator: &NavigationOrchestrator,
    browser: &SimulatedBrowser,
    event: HostEvent,
    steps: &mut Vec<ReplayStep>,
) {
    let mut pending = VecDeque::from([event]);
    let mut followed = 0;

    while let Some(event) = pending.pop_front() {
        browser.observe(&event);
        let outcome = orchestrator.handle(event.clone()).await;

        if let (HostEvent::NavigationStarted { tab_id, .. }, EventOutcome::Redirected { target, .. }) =
            (&event, &outcome)
        {
            if followed < MAX_REDIRECT_CHAIN {
                followed += 1;
                pending.push_back(HostEvent::NavigationStarted {
                    tab_id: *tab_id,
                    url: target.clone(),
                });
                pending.push_back(HostEvent::NavigationCompleted {
                    tab_id: *tab_id,
                    url: target.clone(),
                });
            } else {
                warn!("Tab {} exceeded {} chained redirects", tab_id, MAX_REDIRECT_CHAIN);
            }
        }

        steps.push(ReplayStep { event, outcome });
    }
}

/// Classify the stored rules of `kind` against `url`
pub async fn inspect(config: &AgentConfig, url: &str, kind: RuleKind) -> Result<InspectReport> {
    let store = JsonFileRuleStore::new(&config.rules_path);
    let rules = resolve_rules(&store.load_rules().await?);

    let compiled = CompiledRules::new(&rules);
    let groups = compiled.partition(Some(url), kind);
    let owned = |group: Vec<&Rule>| group.into_iter().cloned().collect::<Vec<_>>();

    Ok(InspectReport {
        url: url.to_string(),
        kind,
        match_count: compiled.count_matches(url),
        redirect_target: compiled.select_redirect_rule(url).map(|rule| rule.value.clone()),
        active: owned(groups.active),
        enabled_inactive: owned(groups.enabled_inactive),
        disabled: owned(groups.disabled),
    })
}

pub fn suggest(url: &str, kind: RuleKind) -> Result<SuggestReport> {
    Ok(SuggestReport {
        url: url.to_string(),
        kind,
        patterns: suggest_patterns(url, kind)?,
    })
}
