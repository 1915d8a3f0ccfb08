use super::*;
use crate::archive::UnavailableArchiveEngine;
use crate::config::Par2Dialect;
use crate::error::Error;
use crate::parity::UnavailableParityHandler;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Orchestrator whose external tools are all missing
fn offline(config: Config) -> Orchestrator {
    Orchestrator::new(
        config,
        Tools {
            archive: Arc::new(UnavailableArchiveEngine),
            parity: Arc::new(UnavailableParityHandler::new(Par2Dialect::Par2j)),
        },
    )
    .unwrap()
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<String> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let value = serde_json::to_value(&event).unwrap();
        kinds.push(value["type"].as_str().unwrap().to_string());
    }
    kinds
}

#[tokio::test]
async fn test_protect_without_archive_tool_is_fatal_and_keeps_source() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("album");
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("a.jpg"), b"jpeg bytes").unwrap();
    let orch = offline(Config::default());
    let mut rx = orch.subscribe();

    let err = orch.protect_folder(&folder).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(folder.join("a.jpg").exists());
    assert!(!folder.join("album.7z.001").exists());
    assert_eq!(drain(&mut rx), vec!["protecting", "failed"]);
}

#[tokio::test]
async fn test_protect_missing_folder_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = offline(Config::default())
        .protect_folder(&dir.path().join("gone"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_deduplicate_quarantines_and_emits_events() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.jpg"), b"same").unwrap();
    fs::write(dir.path().join("copy.jpg"), b"same").unwrap();
    let orch = offline(Config::default());
    let mut rx = orch.subscribe();

    let report = orch.deduplicate(dir.path(), None, true).unwrap();

    assert_eq!(report.groups.len(), 1);
    let quarantine = report.quarantine.unwrap();
    assert_eq!(quarantine.moved.len(), 1);
    assert_eq!(quarantine.moved[0].from, dir.path().join("copy.jpg"));
    assert!(dir.path().join("duplicates/copy.jpg").exists());
    assert_eq!(drain(&mut rx), vec!["quarantined"]);
}

#[tokio::test]
async fn test_deduplicate_report_only_moves_nothing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"same").unwrap();
    fs::write(dir.path().join("b.txt"), b"same").unwrap();
    let orch = offline(Config::default());

    let report = orch
        .deduplicate(dir.path(), Some(&["txt".to_string()]), false)
        .unwrap();
    assert_eq!(report.groups.len(), 1);
    assert!(report.quarantine.is_none());
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.recovery.redundancy_percent = 150;
    let result = Orchestrator::new(
        config,
        Tools {
            archive: Arc::new(UnavailableArchiveEngine),
            parity: Arc::new(UnavailableParityHandler::new(Par2Dialect::Par2j)),
        },
    );
    assert!(matches!(result, Err(Error::Config { .. })));
}

#[test]
fn test_tools_without_search_are_unavailable() {
    let tools = ToolsConfig {
        search_path: false,
        ..ToolsConfig::default()
    };
    let resolved = Tools::from_config(&tools, &ArchiveConfig::default());
    assert_eq!(resolved.archive.name(), "unavailable");
    assert_eq!(resolved.parity.name(), "unavailable");
}

#[test]
fn test_tools_explicit_paths_win() {
    let tools = ToolsConfig {
        sevenzip_path: Some(PathBuf::from("/opt/7z")),
        par2_path: Some(PathBuf::from("/opt/par2")),
        par2_dialect: Par2Dialect::Par2Cmdline,
        search_path: false,
    };
    let resolved = Tools::from_config(&tools, &ArchiveConfig::default());
    assert_eq!(resolved.archive.name(), "cli-7z");
    assert_eq!(resolved.parity.name(), "cli-par2");
}
