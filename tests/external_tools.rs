//! End-to-end tests against the real 7-Zip and par2cmdline binaries
//!
//! All tests are marked #[ignore] to prevent running in normal CI. Each test
//! skips itself when `7z` or `par2` is not on PATH.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test external_tools -- --ignored --nocapture
//! ```

use parvault::{
    ArchiveStatus, Config, Orchestrator, Par2Dialect, RecoveryState, Tools, VerificationOutcome,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn real_tools_config() -> Config {
    let mut config = Config::default();
    config.tools.par2_dialect = Par2Dialect::Par2Cmdline;
    config.recovery.check_disk_space = false;
    config
}

/// Orchestrator over real binaries, or None when either is missing
fn real_orchestrator() -> Option<Orchestrator> {
    let config = real_tools_config();
    let tools = Tools::from_config(&config.tools, &config.archive);
    if tools.archive.name() == "unavailable" || tools.parity.name() == "unavailable" {
        eprintln!("Skipping: 7z and par2 must both be on PATH");
        return None;
    }
    Some(Orchestrator::new(config, tools).unwrap())
}

fn write_sample(folder: &Path) {
    fs::create_dir_all(folder.join("nested")).unwrap();
    let pattern: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    fs::write(folder.join("photo.jpg"), &pattern).unwrap();
    fs::write(folder.join("nested/video.mov"), pattern.repeat(3)).unwrap();
}

#[tokio::test]
#[ignore]
async fn test_real_protect_and_restore() {
    let Some(orchestrator) = real_orchestrator() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("holiday");
    write_sample(&folder);
    let original = fs::read(folder.join("nested/video.mov")).unwrap();

    let report = orchestrator.protect_folder(&folder).await.unwrap();
    assert_eq!(report.job.status(), ArchiveStatus::Created);
    assert!(matches!(report.recovery, RecoveryState::Generated { .. }));
    assert!(!folder.join("photo.jpg").exists());
    assert!(report.recovery.output().exists());

    let restored = orchestrator.restore_tree(dir.path()).await.unwrap();
    assert!(restored.is_success(), "failures: {:?}", restored.failures);
    assert_eq!(restored.completed[0].outcome, VerificationOutcome::AllComplete);
    assert_eq!(
        fs::read(folder.join("holiday/holiday/nested/video.mov")).unwrap(),
        original
    );
}

#[tokio::test]
#[ignore]
async fn test_real_repair_of_damaged_volume() {
    let Some(orchestrator) = real_orchestrator() else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("scans");
    write_sample(&folder);

    let report = orchestrator.protect_folder(&folder).await.unwrap();
    let volume = report.volumes[0].clone();

    // flip a run of bytes in the middle of the first volume
    let mut bytes = fs::read(&volume).unwrap();
    let mid = bytes.len() / 2;
    for b in bytes.iter_mut().skip(mid).take(512) {
        *b ^= 0x5a;
    }
    fs::write(&volume, bytes).unwrap();

    let restored = orchestrator.restore_archive(&volume).await.unwrap();
    assert_eq!(restored.outcome, VerificationOutcome::RepairSucceeded);
    assert!(folder.join("scans/scans/photo.jpg").exists());
}
