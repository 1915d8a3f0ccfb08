//! Protect workflow: seal a folder into an archive, then generate recovery data

use super::{Orchestrator, ProtectReport, RecoveryState, TreeReport, UnitFailure};
use crate::archive::CreateOptions;
use crate::archive::volumes::{
    archive_path_for, find_volumes, promote_volumes, remove_volumes, staging_path_for,
};
use crate::error::{Error, Result, io_at};
use crate::types::{ArchiveJob, ArchiveStatus, Event, Stage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Absolute form of an existing directory
fn existing_dir(path: &Path) -> Result<PathBuf> {
    let metadata = std::fs::metadata(path).map_err(|e| io_at(path, e))?;
    if !metadata.is_dir() {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    std::path::absolute(path).map_err(|e| io_at(path, e))
}

/// Immediate children of `folder` that are not volumes of the staging archive
fn source_entries(folder: &Path, staging: &Path) -> Result<Vec<PathBuf>> {
    let staged = find_volumes(staging)?;
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(|e| io_at(folder, e))? {
        let path = entry.map_err(|e| io_at(folder, e))?.path();
        if !staged.contains(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}

/// Remove snapshotted source entries; returns how many could not be removed
fn remove_source_entries(entries: &[PathBuf]) -> usize {
    let mut failed = 0;
    for entry in entries {
        let result = match std::fs::symlink_metadata(entry) {
            Ok(m) if m.is_dir() => std::fs::remove_dir_all(entry),
            Ok(_) => std::fs::remove_file(entry),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(path = ?entry, error = %e, "could not remove archived source entry");
            failed += 1;
        }
    }
    failed
}

impl Orchestrator {
    /// Seal `folder` into `<folder>/<name>.7z` and protect it with recovery data
    ///
    /// An existing archive is reused (`AlreadyExists`) and existing recovery
    /// data is kept, so running this twice is safe. A failed archive step
    /// never proceeds to recovery generation.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `InvalidPath` when `folder` is not an existing directory
    /// - `ToolNotFound` when an external tool is missing
    /// - `ToolExecutionFailed` when archiving, testing or recovery generation fails
    pub async fn protect_folder(&self, folder: &Path) -> Result<ProtectReport> {
        let folder = existing_dir(folder)?;
        let archive_path = archive_path_for(&folder)?;
        let mut job = ArchiveJob::new(folder.clone(), archive_path.clone());

        self.emit_event(Event::Protecting {
            folder: folder.clone(),
        });

        let mut archive_error = None;
        let existing = find_volumes(&archive_path)?;
        if existing.is_empty() {
            match self.seal(&folder, &archive_path).await {
                Ok(volumes) => {
                    job.transition(ArchiveStatus::Created)?;
                    info!(?archive_path, volumes, "archive created");
                    self.emit_event(Event::ArchiveCreated {
                        archive: archive_path.clone(),
                        volumes,
                    });
                }
                Err(e) => {
                    job.transition(ArchiveStatus::Failed)?;
                    archive_error = Some(e);
                }
            }
        } else {
            job.transition(ArchiveStatus::AlreadyExists)?;
            info!(?archive_path, volumes = existing.len(), "archive already exists");
            self.emit_event(Event::ArchiveExists {
                archive: archive_path.clone(),
            });
        }

        if !job.is_sealed() {
            let e = archive_error.unwrap_or_else(|| Error::not_found(&archive_path));
            return Err(self.report_failure(&folder, Stage::Archive, e));
        }

        let volumes = find_volumes(&archive_path)?;
        if volumes.is_empty() {
            let e = Error::not_found(&archive_path);
            return Err(self.report_failure(&folder, Stage::Archive, e));
        }

        let recovery = match self.planner.protect(&volumes).await {
            Ok(generated) => {
                self.emit_event(Event::RecoveryGenerated {
                    output: generated.output.clone(),
                    recovery_files: generated.plan.recovery_file_count(),
                });
                RecoveryState::Generated {
                    output: generated.output,
                    plan: generated.plan,
                }
            }
            Err(Error::OutputAlreadyExists(output)) => {
                info!(?output, "recovery data already present");
                self.emit_event(Event::RecoveryExists {
                    output: output.clone(),
                });
                RecoveryState::AlreadyPresent { output }
            }
            Err(e) => return Err(self.report_failure(&folder, Stage::Recovery, e)),
        };

        Ok(ProtectReport {
            job,
            volumes,
            recovery,
        })
    }

    /// Create the archive for `folder`, returning the number of volumes written
    async fn seal(&self, folder: &Path, archive_path: &Path) -> Result<usize> {
        let settings = &self.config.archive;

        if !settings.two_phase {
            let options = CreateOptions {
                delete_source: settings.delete_source,
            };
            self.archive.create(folder, archive_path, options).await?;
            return Ok(find_volumes(archive_path)?.len());
        }

        let staging = staging_path_for(folder)?;
        let stale = remove_volumes(&staging)?;
        if stale > 0 {
            warn!(?staging, stale, "removed stale staging archive");
        }

        let entries = source_entries(folder, &staging)?;
        debug!(?folder, entries = entries.len(), "archiving into staging name");

        let staged = self
            .stage_and_test(folder, &staging)
            .await
            .and_then(|()| promote_volumes(&staging, archive_path));
        let promoted = match staged {
            Ok(promoted) => promoted,
            Err(e) => {
                if let Err(cleanup) = remove_volumes(&staging) {
                    warn!(?staging, error = %cleanup, "could not remove staging archive");
                }
                return Err(e);
            }
        };

        if settings.delete_source {
            let failed = remove_source_entries(&entries);
            if failed > 0 {
                warn!(?folder, failed, "archive sealed but some source entries remain");
            }
        }
        Ok(promoted.len())
    }

    async fn stage_and_test(&self, folder: &Path, staging: &Path) -> Result<()> {
        self.archive
            .create(folder, staging, CreateOptions::default())
            .await?;

        let staged = find_volumes(staging)?;
        let entry_point = staged.first().ok_or_else(|| Error::not_found(staging))?;
        self.archive.test(entry_point).await
    }

    /// Run [`protect_folder`](Self::protect_folder) on every immediate subdirectory of `root`
    ///
    /// Subdirectories are processed in name order. A missing external tool
    /// aborts the batch; other failures are recorded and the batch continues.
    pub async fn protect_tree(&self, root: &Path) -> Result<TreeReport<ProtectReport>> {
        let root = existing_dir(root)?;
        let mut report = TreeReport::start(root.clone());

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(|e| io_at(&root, e))? {
            let entry = entry.map_err(|e| io_at(&root, e))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                folders.push(entry.path());
            }
        }
        folders.sort();

        for folder in folders {
            match self.protect_folder(&folder).await {
                Ok(unit) => report.completed.push(unit),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.failures.push(UnitFailure::new(folder, &e)),
            }
        }

        let report = report.finish();
        info!(
            ?root,
            completed = report.completed.len(),
            failed = report.failures.len(),
            "protect finished"
        );
        Ok(report)
    }
}
