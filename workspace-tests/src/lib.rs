//! Shared fixtures for the cross-crate tests

use stash_orchestrator::HostEvent;
use std::path::{Path, PathBuf};

/// Root of the workspace, for tests that read member manifests
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".."))
}

/// Write `events` as a JSON-lines trace at `path`
pub fn write_trace(path: &Path, events: &[HostEvent]) -> anyhow::Result<()> {
    let mut content = String::new();
    for event in events {
        content.push_str(&serde_json::to_string(event)?);
        content.push('\n');
    }
    std::fs::write(path, content)?;
    Ok(())
}

pub fn started(tab_id: u64, url: &str) -> HostEvent {
    HostEvent::NavigationStarted {
        tab_id,
        url: url.to_string(),
    }
}

pub fn completed(tab_id: u64, url: &str) -> HostEvent {
    HostEvent::NavigationCompleted {
        tab_id,
        url: url.to_string(),
    }
}
