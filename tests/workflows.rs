//! End-to-end workflow tests over the public API
//!
//! External tools are replaced by the manifest fakes in `common`, so these
//! tests exercise the real filesystem layout, the two-phase archive commit,
//! recovery naming, verification and extraction without 7-Zip or par2.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test workflows
//! ```

mod common;

use common::{
    ManifestParity, collect_events_until, drain_events, fake_orchestrator, fake_orchestrator_with,
    make_folder,
};
use parvault::{
    ArchiveStatus, Config, Error, Event, Orchestrator, RecoveryState, Tools,
    UnavailableArchiveEngine, UnavailableParityHandler, VerificationOutcome,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn photo_library(root: &std::path::Path) {
    make_folder(
        root,
        "2019-rome",
        &[("IMG_0001.jpg", b"colosseum"), ("clips/walk.mov", b"via appia")],
    );
    make_folder(root, "2020-oslo", &[("IMG_0100.jpg", b"fjord")]);
}

// ============================================================================
// Protect
// ============================================================================

#[tokio::test]
async fn test_protect_tree_then_restore_tree_round_trip() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let (orchestrator, _, _) = fake_orchestrator();

    let protected = orchestrator.protect_tree(dir.path()).await.unwrap();
    assert!(protected.is_success());
    assert_eq!(protected.completed.len(), 2);

    let rome = dir.path().join("2019-rome");
    let mut left: Vec<_> = fs::read_dir(&rome)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["2019-rome.7z.001", "2019-rome.7z.001.par2"]);

    let restored = orchestrator.restore_tree(dir.path()).await.unwrap();
    assert!(restored.is_success());
    assert_eq!(restored.completed.len(), 2);
    assert!(
        restored
            .completed
            .iter()
            .all(|r| r.outcome == VerificationOutcome::AllComplete)
    );
    assert_eq!(
        fs::read(rome.join("2019-rome/2019-rome/clips/walk.mov")).unwrap(),
        b"via appia"
    );
    assert_eq!(
        fs::read(dir.path().join("2020-oslo/2020-oslo/2020-oslo/IMG_0100.jpg")).unwrap(),
        b"fjord"
    );
}

#[tokio::test]
async fn test_protect_tree_twice_does_no_new_work() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let (orchestrator, engine, parity) = fake_orchestrator();

    orchestrator.protect_tree(dir.path()).await.unwrap();
    let second = orchestrator.protect_tree(dir.path()).await.unwrap();

    assert!(second.is_success());
    assert!(
        second
            .completed
            .iter()
            .all(|u| u.job.status() == ArchiveStatus::AlreadyExists)
    );
    assert!(
        second
            .completed
            .iter()
            .all(|u| matches!(u.recovery, RecoveryState::AlreadyPresent { .. }))
    );
    assert_eq!(engine.creates(), 2);
    assert_eq!(parity.creates(), 2);
}

#[tokio::test]
async fn test_protect_tree_aborts_without_archive_tool() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let orchestrator = Orchestrator::new(
        Config::default(),
        Tools {
            archive: Arc::new(UnavailableArchiveEngine),
            parity: Arc::new(ManifestParity::default()),
        },
    )
    .unwrap();

    let err = orchestrator.protect_tree(dir.path()).await.unwrap_err();

    assert!(matches!(err, Error::ToolNotFound { .. }));
    assert!(dir.path().join("2019-rome/IMG_0001.jpg").exists());
    assert!(dir.path().join("2020-oslo/IMG_0100.jpg").exists());
}

#[tokio::test]
async fn test_protect_events_reach_a_spawned_subscriber() {
    let dir = TempDir::new().unwrap();
    let folder = make_folder(dir.path(), "scans", &[("page1.png", b"p1")]);
    let (orchestrator, _, _) = fake_orchestrator();
    let mut rx = orchestrator.subscribe();

    let collector = tokio::spawn(async move {
        collect_events_until(&mut rx, Duration::from_secs(5), |e| {
            matches!(e, Event::RecoveryGenerated { .. })
        })
        .await
    });

    orchestrator.protect_folder(&folder).await.unwrap();
    let events = collector.await.unwrap();

    assert!(matches!(events.first(), Some(Event::Protecting { .. })));
    match events.last() {
        Some(Event::RecoveryGenerated {
            output,
            recovery_files,
        }) => {
            assert_eq!(output, &folder.join("scans.7z.001.par2"));
            assert_eq!(*recovery_files, 1);
        }
        other => panic!("unexpected last event: {other:?}"),
    }
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_restore_repairs_bit_rot() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let (orchestrator, _, _) = fake_orchestrator();
    orchestrator.protect_tree(dir.path()).await.unwrap();

    let volume = dir.path().join("2020-oslo/2020-oslo.7z.001");
    let mut bytes = fs::read(&volume).unwrap();
    bytes[0] ^= 0xff;
    fs::write(&volume, bytes).unwrap();

    let report = orchestrator.restore_tree(dir.path()).await.unwrap();

    assert!(report.is_success());
    let oslo = report
        .completed
        .iter()
        .find(|r| r.archive == volume)
        .unwrap();
    assert_eq!(oslo.outcome, VerificationOutcome::RepairSucceeded);
    assert!(
        dir.path()
            .join("2020-oslo/2020-oslo/2020-oslo/IMG_0100.jpg")
            .exists()
    );
}

#[tokio::test]
async fn test_restore_tree_reports_unrepairable_archive_and_continues() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let (orchestrator, _, _) = fake_orchestrator_with(
        Config::default(),
        ManifestParity {
            repair_fails: true,
            ..ManifestParity::default()
        },
    );
    orchestrator.protect_tree(dir.path()).await.unwrap();
    fs::write(dir.path().join("2019-rome/2019-rome.7z.001"), b"rot").unwrap();
    let mut rx = orchestrator.subscribe();

    let report = orchestrator.restore_tree(dir.path()).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].code, "repair_failed");
    assert!(!dir.path().join("2019-rome/2019-rome").exists());

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::RepairComplete { success: false, .. }
    )));
    assert!(events.iter().any(|e| matches!(e, Event::Failed { .. })));
}

#[tokio::test]
async fn test_restore_tree_aborts_without_parity_tool() {
    let dir = TempDir::new().unwrap();
    photo_library(dir.path());
    let (orchestrator, _, _) = fake_orchestrator();
    orchestrator.protect_tree(dir.path()).await.unwrap();

    let without_parity = Orchestrator::new(
        Config::default(),
        Tools {
            archive: Arc::new(common::ManifestEngine::default()),
            parity: Arc::new(UnavailableParityHandler::new(Default::default())),
        },
    )
    .unwrap();

    let err = without_parity.restore_tree(dir.path()).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.error_code(), "tool_not_found");
}

// ============================================================================
// Duplicates
// ============================================================================

#[tokio::test]
async fn test_deduplicate_keeps_shortest_path_and_quarantines_the_rest() {
    let dir = TempDir::new().unwrap();
    make_folder(
        dir.path(),
        "camera",
        &[
            ("a.jpg", b"sunset"),
            ("backup/a-copy.jpg", b"sunset"),
            ("b.jpg", b"sunrise"),
            ("notes.txt", b"sunset"),
        ],
    );
    let (orchestrator, _, _) = fake_orchestrator();
    let root = dir.path().join("camera");

    let report = orchestrator.deduplicate(&root, None, true).unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].keeper(), root.join("a.jpg"));
    let quarantine = report.quarantine.unwrap();
    assert!(quarantine.failed.is_empty());
    assert_eq!(quarantine.moved.len(), 1);
    assert_eq!(
        quarantine.moved[0].to,
        root.join("backup/duplicates/a-copy.jpg")
    );
    assert!(root.join("a.jpg").exists());
    assert!(root.join("notes.txt").exists());
    assert!(!root.join("backup/a-copy.jpg").exists());

    // a second scan ignores the quarantine folder
    let again = orchestrator.deduplicate(&root, None, false).unwrap();
    assert!(again.groups.is_empty());
}
