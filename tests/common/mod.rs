//! Common test utilities for parvault integration tests

#[allow(dead_code)]
pub mod fakes;

pub use fakes::*;

use parvault::{Config, Event, Orchestrator, Tools};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Orchestrator over the manifest fakes, with default configuration
#[allow(dead_code)]
pub fn fake_orchestrator() -> (Orchestrator, Arc<ManifestEngine>, Arc<ManifestParity>) {
    fake_orchestrator_with(Config::default(), ManifestParity::default())
}

/// Orchestrator over the manifest fakes with a custom config and parity fake
#[allow(dead_code)]
pub fn fake_orchestrator_with(
    config: Config,
    parity: ManifestParity,
) -> (Orchestrator, Arc<ManifestEngine>, Arc<ManifestParity>) {
    let engine = Arc::new(ManifestEngine::default());
    let parity = Arc::new(parity);
    let orchestrator = Orchestrator::new(
        config,
        Tools {
            archive: engine.clone(),
            parity: parity.clone(),
        },
    )
    .expect("default config is valid");
    (orchestrator, engine, parity)
}

/// Write `files` (relative path, content) under `root/name`
#[allow(dead_code)]
pub fn make_folder(root: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let folder = root.join(name);
    for (rel, content) in files {
        let path = folder.join(rel);
        std::fs::create_dir_all(path.parent().expect("file has a parent")).unwrap();
        std::fs::write(path, content).unwrap();
    }
    folder
}

/// Drain every event already queued on `rx`
#[allow(dead_code)]
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// `type` tags of every event already queued on `rx`
#[allow(dead_code)]
pub fn drain_event_kinds(rx: &mut broadcast::Receiver<Event>) -> Vec<String> {
    drain_events(rx)
        .iter()
        .map(|event| {
            let value = serde_json::to_value(event).expect("events serialize");
            value["type"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

/// Orchestrator over the given engine and parity fakes
#[allow(dead_code)]
pub fn orchestrator_over(
    config: Config,
    archive: Arc<dyn parvault::ArchiveEngine>,
    parity: Arc<dyn parvault::ParityHandler>,
) -> Orchestrator {
    Orchestrator::new(config, Tools { archive, parity }).expect("config is valid")
}

/// Collect events until `done` matches one, or the timeout elapses
#[allow(dead_code)]
pub async fn collect_events_until<F>(
    rx: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    done: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = rx.recv().await {
            let finished = done(&event);
            events.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    events
}
