//! Restore workflow: verify an archive against its recovery data, repair, extract

use super::{Orchestrator, RestoreReport, TreeReport, UnitFailure};
use crate::archive::{find_archives, recovery_candidates, strip_archive_extension};
use crate::error::{Error, Result};
use crate::integrity::VerificationOutcome;
use crate::types::{Event, Stage};
use std::path::{Path, PathBuf};
use tracing::info;

impl Orchestrator {
    /// Verify, repair when needed, and extract the archive whose entry point is `archive`
    ///
    /// The archive is extracted into a folder named after it, beside it, only
    /// when verification ends in `AllComplete` or `RepairSucceeded`.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the archive or its recovery file is missing
    /// - `Unparseable` when the verification report is not recognised
    /// - `RepairFailed` when damage could not be (or was not allowed to be) repaired
    /// - `ToolNotFound` / `ToolExecutionFailed` from the external tools
    pub async fn restore_archive(&self, archive: &Path) -> Result<RestoreReport> {
        if !archive.is_file() {
            return Err(self.report_failure(archive, Stage::Verify, Error::not_found(archive)));
        }

        let candidates = recovery_candidates(archive);
        let Some(par2) = candidates.iter().find(|c| c.is_file()).cloned() else {
            let expected = candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| archive.to_path_buf());
            self.emit_event(Event::Skipped {
                path: archive.to_path_buf(),
                reason: "no recovery file".to_string(),
            });
            return Err(self.report_failure(archive, Stage::Verify, Error::not_found(expected)));
        };

        let check = match self
            .verifier
            .check_detailed(&par2, self.config.restore.attempt_repair)
            .await
        {
            Ok(check) => check,
            Err(e) => return Err(self.report_failure(archive, Stage::Verify, e)),
        };

        if !check.outcome.allows_extraction() {
            let (stage, error) = match check.outcome {
                VerificationOutcome::Unparseable => (
                    Stage::Verify,
                    Error::Unparseable {
                        path: par2.clone(),
                        output: check.last_output().trim().to_string(),
                    },
                ),
                VerificationOutcome::RepairableDamage => (
                    Stage::Repair,
                    Error::RepairFailed {
                        path: par2.clone(),
                        reason: "damage found and repair is disabled".to_string(),
                    },
                ),
                _ => (
                    Stage::Repair,
                    Error::RepairFailed {
                        path: par2.clone(),
                        reason: check.last_output().trim().to_string(),
                    },
                ),
            };
            self.emit_event(Event::Skipped {
                path: archive.to_path_buf(),
                reason: format!("verification ended in {}", check.outcome),
            });
            return Err(self.report_failure(archive, stage, error));
        }

        let destination = strip_archive_extension(archive);
        self.emit_event(Event::Extracting {
            archive: archive.to_path_buf(),
            destination: destination.clone(),
        });
        if let Err(e) = self.archive.extract(archive, &destination).await {
            return Err(self.report_failure(archive, Stage::Extract, e));
        }
        self.emit_event(Event::ExtractComplete {
            archive: archive.to_path_buf(),
        });
        info!(?archive, ?destination, outcome = %check.outcome, "archive restored");

        Ok(RestoreReport {
            archive: archive.to_path_buf(),
            par2,
            outcome: check.outcome,
            destination,
        })
    }

    /// Run [`restore_archive`](Self::restore_archive) on every archive entry point under `root`
    ///
    /// A missing external tool aborts the batch; other failures are recorded
    /// and the batch continues.
    pub async fn restore_tree(&self, root: &Path) -> Result<TreeReport<RestoreReport>> {
        let root: PathBuf = std::path::absolute(root).map_err(|e| crate::error::io_at(root, e))?;
        let archives = find_archives(&root)?;
        let mut report = TreeReport::start(root.clone());

        for archive in archives {
            match self.restore_archive(&archive).await {
                Ok(unit) => report.completed.push(unit),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.failures.push(UnitFailure::new(archive, &e)),
            }
        }

        let report = report.finish();
        info!(
            ?root,
            restored = report.completed.len(),
            failed = report.failures.len(),
            "restore finished"
        );
        Ok(report)
    }
}
