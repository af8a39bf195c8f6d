use async_trait::async_trait;
use stash_core::{IndicatorState, RuleKind, RuleRecord};
use stash_orchestrator::{
    EventOutcome, HostEvent, IndicatorSink, InstallReason, MemoryRuleStore, NavigationOrchestrator,
    PageCommand, PageOutput, PageScripting, RuleStore, RulesChanged, ScriptError, StorageItem,
    StoreError, TabDirectory, TabId, TabPhase,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

/// Host double that records every page command and indicator update
#[derive(Default)]
struct RecordingHost {
    commands: Mutex<Vec<(TabId, PageCommand)>>,
    indicators: Mutex<HashMap<TabId, IndicatorState>>,
    urls: Mutex<HashMap<TabId, String>>,
    active: Mutex<Option<TabId>>,
    /// Storage keys whose writes the page rejects
    failing_keys: Vec<String>,
}

impl RecordingHost {
    fn commands(&self) -> Vec<(TabId, PageCommand)> {
        self.commands.lock().unwrap().clone()
    }

    fn indicator_text(&self, tab_id: TabId) -> Option<String> {
        self.indicators.lock().unwrap().get(&tab_id).map(|s| s.text.clone())
    }
}

#[async_trait]
impl PageScripting for RecordingHost {
    async fn run(&self, tab_id: TabId, command: PageCommand) -> Result<PageOutput, ScriptError> {
        self.commands.lock().unwrap().push((tab_id, command.clone()));
        match command {
            PageCommand::SetLocalStorage { key, .. } if self.failing_keys.contains(&key) => {
                Err(ScriptError::Failed("storage disabled".to_string()))
            }
            PageCommand::ReadLocalStorage => Ok(PageOutput::StorageItems(vec![StorageItem {
                key: "theme".to_string(),
                value: "dark".to_string(),
            }])),
            _ => Ok(PageOutput::Done),
        }
    }
}

#[async_trait]
impl IndicatorSink for RecordingHost {
    async fn set_indicator(&self, tab_id: TabId, state: IndicatorState) {
        self.indicators.lock().unwrap().insert(tab_id, state);
    }
}

#[async_trait]
impl TabDirectory for RecordingHost {
    async fn tab_url(&self, tab_id: TabId) -> Option<String> {
        self.urls.lock().unwrap().get(&tab_id).cloned()
    }

    async fn active_tab(&self) -> Option<(TabId, String)> {
        let active = (*self.active.lock().unwrap())?;
        let url = self.urls.lock().unwrap().get(&active).cloned()?;
        Some((active, url))
    }
}

/// Store whose reads always fail
struct UnavailableStore {
    changes: broadcast::Sender<RulesChanged>,
}

#[async_trait]
impl RuleStore for UnavailableStore {
    async fn load_rules(&self) -> Result<Vec<RuleRecord>, StoreError> {
        Err(StoreError::Unavailable("sync storage offline".to_string()))
    }

    async fn save_rules(&self, _rules: Vec<RuleRecord>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("sync storage offline".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<RulesChanged> {
        self.changes.subscribe()
    }
}

fn storage_rule(id: i64, pattern: &str, key: &str, value: &str) -> RuleRecord {
    RuleRecord {
        id,
        kind: Some(RuleKind::StorageInjection),
        pattern: pattern.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        enabled: Some(true),
    }
}

fn redirect_rule(id: i64, pattern: &str, target: &str) -> RuleRecord {
    RuleRecord {
        id,
        kind: Some(RuleKind::Redirect),
        pattern: pattern.to_string(),
        key: "redirect".to_string(),
        value: target.to_string(),
        enabled: Some(true),
    }
}

fn setup(
    rules: Vec<RuleRecord>,
    host: RecordingHost,
) -> (NavigationOrchestrator, Arc<MemoryRuleStore>, Arc<RecordingHost>) {
    let store = Arc::new(MemoryRuleStore::new(rules));
    let host = Arc::new(host);
    let orchestrator =
        NavigationOrchestrator::new(store.clone(), host.clone(), host.clone(), host.clone());
    (orchestrator, store, host)
}

fn started(tab_id: TabId, url: &str) -> HostEvent {
    HostEvent::NavigationStarted {
        tab_id,
        url: url.to_string(),
    }
}

fn completed(tab_id: TabId, url: &str) -> HostEvent {
    HostEvent::NavigationCompleted {
        tab_id,
        url: url.to_string(),
    }
}

#[tokio::test]
async fn test_injection_on_complete_in_rule_order() {
    let (orchestrator, _, host) = setup(
        vec![
            storage_rule(1, "https://a.com/*", "first", "1"),
            storage_rule(2, "https://b.com/*", "other", "x"),
            storage_rule(3, "*", "second", "2"),
        ],
        RecordingHost::default(),
    );

    assert_eq!(orchestrator.handle(started(1, "https://a.com/page")).await, EventOutcome::NoAction);
    assert!(host.commands().is_empty(), "nothing is injected while loading");

    let outcome = orchestrator.handle(completed(1, "https://a.com/page")).await;
    assert_eq!(outcome, EventOutcome::Injected { applied: 2, failed: 0 });

    let keys: Vec<_> = host
        .commands()
        .into_iter()
        .map(|(_, command)| match command {
            PageCommand::SetLocalStorage { key, .. } => key,
            other => panic!("unexpected command {:?}", other),
        })
        .collect();
    assert_eq!(keys, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(host.indicator_text(1).as_deref(), Some("2"));
    assert_eq!(orchestrator.tab_state(1).unwrap().phase, TabPhase::Complete);
}

#[tokio::test]
async fn test_failed_write_does_not_stop_remaining_rules() {
    let host = RecordingHost {
        failing_keys: vec!["blocked".to_string()],
        ..Default::default()
    };
    let (orchestrator, _, host) = setup(
        vec![
            storage_rule(1, "https://a.com/*", "blocked", "1"),
            storage_rule(2, "https://a.com/*", "fine", "2"),
        ],
        host,
    );

    let outcome = orchestrator.handle(completed(1, "https://a.com/x")).await;
    assert_eq!(outcome, EventOutcome::Injected { applied: 1, failed: 1 });
    assert_eq!(host.commands().len(), 2);
}

#[tokio::test]
async fn test_redirect_fires_once_and_suppresses_injection() {
    let (orchestrator, _, host) = setup(
        vec![
            redirect_rule(1, "https://a.com/", "https://b.com/"),
            storage_rule(2, "https://a.com*", "k", "v"),
        ],
        RecordingHost::default(),
    );

    let outcome = orchestrator.handle(started(4, "https://a.com")).await;
    assert_eq!(
        outcome,
        EventOutcome::Redirected {
            rule_id: 1,
            target: "https://b.com/".to_string()
        }
    );
    assert_eq!(
        host.commands(),
        vec![(
            4,
            PageCommand::ReplaceLocation {
                url: "https://b.com/".to_string()
            }
        )]
    );

    // The old page finishing must not receive storage writes
    let outcome = orchestrator.handle(completed(4, "https://a.com")).await;
    assert_eq!(outcome, EventOutcome::InjectionSkipped);
    assert_eq!(host.commands().len(), 1);

    // The destination loads normally
    orchestrator.handle(started(4, "https://b.com/")).await;
    let outcome = orchestrator.handle(completed(4, "https://b.com/")).await;
    assert_eq!(outcome, EventOutcome::Injected { applied: 0, failed: 0 });
}

#[tokio::test]
async fn test_redirected_page_completing_with_trailing_slash_is_skipped() {
    let (orchestrator, _, host) = setup(
        vec![
            redirect_rule(1, "https://a.com/", "https://b.com/"),
            storage_rule(2, "https://a.com*", "k", "v"),
        ],
        RecordingHost::default(),
    );

    let outcome = orchestrator.handle(started(1, "https://a.com")).await;
    assert!(matches!(outcome, EventOutcome::Redirected { rule_id: 1, .. }));

    // The host reports the finished page in its canonical form
    let outcome = orchestrator.handle(completed(1, "https://a.com/")).await;
    assert_eq!(outcome, EventOutcome::InjectionSkipped);
    assert!(host
        .commands()
        .iter()
        .all(|(_, command)| !matches!(command, PageCommand::SetLocalStorage { .. })));
}

#[tokio::test]
async fn test_self_redirect_is_ignored() {
    let (orchestrator, _, host) = setup(
        vec![redirect_rule(1, "https://a.com/", "https://a.com")],
        RecordingHost::default(),
    );

    assert_eq!(orchestrator.handle(started(1, "https://a.com")).await, EventOutcome::NoAction);
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_non_web_pages_are_untouched() {
    let (orchestrator, _, host) = setup(
        vec![storage_rule(1, "*", "k", "v")],
        RecordingHost::default(),
    );

    assert_eq!(
        orchestrator.handle(started(1, "chrome://extensions")).await,
        EventOutcome::NonWebPage
    );
    assert_eq!(
        orchestrator.handle(completed(1, "chrome://extensions")).await,
        EventOutcome::NonWebPage
    );
    assert!(host.commands().is_empty());
    assert_eq!(host.indicator_text(1).as_deref(), Some(""));
}

#[tokio::test]
async fn test_activation_refreshes_indicator_only() {
    let (orchestrator, _, host) = setup(
        vec![
            redirect_rule(1, "https://a.com", "https://b.com"),
            storage_rule(2, "https://a.com*", "k", "v"),
        ],
        RecordingHost::default(),
    );
    host.urls.lock().unwrap().insert(9, "https://a.com".to_string());

    let outcome = orchestrator.handle(HostEvent::Activated { tab_id: 9 }).await;
    assert_eq!(outcome, EventOutcome::IndicatorRefreshed);
    assert_eq!(host.indicator_text(9).as_deref(), Some("2"));
    assert!(host.commands().is_empty(), "activation must not redirect or inject");
    assert_eq!(orchestrator.registry().active(), Some(9));
}

#[tokio::test]
async fn test_rule_change_refreshes_active_tab() {
    let (orchestrator, store, host) = setup(vec![], RecordingHost::default());

    orchestrator.handle(started(2, "https://a.com/x")).await;
    orchestrator.handle(completed(2, "https://a.com/x")).await;
    orchestrator.handle(HostEvent::Activated { tab_id: 2 }).await;
    assert_eq!(host.indicator_text(2).as_deref(), Some(""));

    store
        .save_rules(vec![storage_rule(1, "https://a.com/*", "k", "v")])
        .await
        .unwrap();
    assert_eq!(orchestrator.handle_rules_changed().await, EventOutcome::IndicatorRefreshed);
    assert_eq!(host.indicator_text(2).as_deref(), Some("1"));
    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_rule_change_falls_back_to_host_active_tab() {
    let (orchestrator, _, host) = setup(
        vec![storage_rule(1, "https://a.com/*", "k", "v")],
        RecordingHost::default(),
    );
    host.urls.lock().unwrap().insert(5, "https://a.com/".to_string());
    *host.active.lock().unwrap() = Some(5);

    assert_eq!(orchestrator.handle_rules_changed().await, EventOutcome::IndicatorRefreshed);
    assert_eq!(host.indicator_text(5).as_deref(), Some("1"));
}

#[tokio::test]
async fn test_store_failure_aborts_event() {
    let (changes, _) = broadcast::channel(4);
    let host = Arc::new(RecordingHost::default());
    let orchestrator = NavigationOrchestrator::new(
        Arc::new(UnavailableStore { changes }),
        host.clone(),
        host.clone(),
        host.clone(),
    );

    let outcome = orchestrator.handle(completed(1, "https://a.com")).await;
    assert!(matches!(outcome, EventOutcome::Aborted { .. }));
    assert!(host.commands().is_empty());

    let outcome = orchestrator
        .handle(HostEvent::Installed {
            reason: InstallReason::Update,
        })
        .await;
    assert!(matches!(outcome, EventOutcome::Aborted { .. }));
}

#[tokio::test]
async fn test_install_migrates_legacy_rules_once() {
    let legacy = RuleRecord {
        kind: None,
        ..storage_rule(1, "https://a.com/*", "k", "v")
    };
    let current = redirect_rule(2, "https://b.com", "https://c.com");
    let (orchestrator, store, _) = setup(vec![legacy.clone(), current.clone()], RecordingHost::default());

    let outcome = orchestrator
        .handle(HostEvent::Installed {
            reason: InstallReason::Update,
        })
        .await;
    assert_eq!(outcome, EventOutcome::Migrated { migrated: 1 });

    let stored = store.snapshot().await;
    assert_eq!(stored[0].kind, Some(RuleKind::StorageInjection));
    assert_eq!(stored[0].pattern, legacy.pattern);
    assert_eq!(stored[1], current);

    let outcome = orchestrator
        .handle(HostEvent::Installed {
            reason: InstallReason::Install,
        })
        .await;
    assert_eq!(outcome, EventOutcome::NoAction);
    assert_eq!(store.snapshot().await, stored);
}

#[tokio::test]
async fn test_closed_tab_is_forgotten() {
    let (orchestrator, _, _) = setup(vec![], RecordingHost::default());
    orchestrator.handle(started(3, "https://a.com")).await;
    assert!(orchestrator.tab_state(3).is_some());

    assert_eq!(orchestrator.handle(HostEvent::Closed { tab_id: 3 }).await, EventOutcome::TabClosed);
    assert!(orchestrator.tab_state(3).is_none());
}

#[tokio::test]
async fn test_storage_suggestions_read_page() {
    let (orchestrator, _, host) = setup(vec![], RecordingHost::default());
    orchestrator.handle(started(1, "https://a.com")).await;

    let items = orchestrator.storage_suggestions(1).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "theme");

    host.urls.lock().unwrap().insert(2, "about:blank".to_string());
    assert!(orchestrator.storage_suggestions(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_loop_processes_events_and_rule_changes() {
    let (orchestrator, store, host) = setup(vec![], RecordingHost::default());
    let orchestrator = Arc::new(orchestrator);
    let (tx, rx) = mpsc::channel(8);

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(rx).await })
    };

    tx.send(started(1, "https://a.com/x")).await.unwrap();
    tx.send(completed(1, "https://a.com/x")).await.unwrap();
    tx.send(HostEvent::Activated { tab_id: 1 }).await.unwrap();

    // Wait until the activation has been processed
    for _ in 0..100 {
        if orchestrator.registry().active() == Some(1) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    store
        .save_rules(vec![storage_rule(1, "https://a.com/*", "k", "v")])
        .await
        .unwrap();

    for _ in 0..100 {
        if host.indicator_text(1).as_deref() == Some("1") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(host.indicator_text(1).as_deref(), Some("1"));

    drop(tx);
    runner.await.unwrap();
}
