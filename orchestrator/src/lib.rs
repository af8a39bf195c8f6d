//! Stash Orchestrator
//!
//! Connects the rule engine in `stash-core` to a browser-like host: it
//! listens for tab lifecycle events, decides which rules apply, and asks the
//! host to redirect, write local storage, or repaint the tab indicator.

pub mod error;
pub mod host;
pub mod logging;
pub mod navigation;
pub mod store;
pub mod tabs;

pub use error::{OrchestratorError, Result, ScriptError, StoreError};
pub use host::{
    HostEvent, IndicatorSink, InstallReason, PageCommand, PageOutput, PageScripting, RuleStore,
    RulesChanged, StorageItem, TabDirectory, TabId,
};
pub use logging::{init_logging, LoggingConfig};
pub use navigation::{EventOutcome, NavigationOrchestrator};
pub use store::{JsonFileRuleStore, MemoryRuleStore};
pub use tabs::{TabPhase, TabRegistry, TabState};
