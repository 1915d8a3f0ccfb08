//! Core types and events

use crate::error::{Error, Result};
use crate::integrity::VerificationOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of an archive job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// Job created, archive not yet attempted
    Pending,
    /// Archive was written by this run
    Created,
    /// Archive was already present, nothing written
    AlreadyExists,
    /// Archive step failed
    Failed,
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArchiveStatus::Pending => "pending",
            ArchiveStatus::Created => "created",
            ArchiveStatus::AlreadyExists => "already_exists",
            ArchiveStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One folder being sealed into an archive
///
/// The status leaves `Pending` exactly once; a job is never reopened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveJob {
    /// Folder whose content is archived
    pub source_folder: PathBuf,
    /// First volume path of the archive (`name.7z`)
    pub archive_path: PathBuf,
    status: ArchiveStatus,
}

impl ArchiveJob {
    /// Create a pending job
    pub fn new(source_folder: PathBuf, archive_path: PathBuf) -> Self {
        Self {
            source_folder,
            archive_path,
            status: ArchiveStatus::Pending,
        }
    }

    /// Current status
    pub fn status(&self) -> ArchiveStatus {
        self.status
    }

    /// Move out of `Pending`; any second transition is rejected
    pub fn transition(&mut self, next: ArchiveStatus) -> Result<()> {
        if self.status != ArchiveStatus::Pending || next == ArchiveStatus::Pending {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Whether recovery data may be generated for this job
    pub fn is_sealed(&self) -> bool {
        matches!(
            self.status,
            ArchiveStatus::Created | ArchiveStatus::AlreadyExists
        )
    }
}

/// Workflow stage, used to tag failures in reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Archive creation
    Archive,
    /// Recovery-data generation
    Recovery,
    /// PAR2 verification
    Verify,
    /// PAR2 repair
    Repair,
    /// Archive extraction
    Extract,
    /// Duplicate quarantine
    Quarantine,
}

/// Event emitted while a workflow runs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Protect workflow started for a folder
    Protecting {
        /// Folder being protected
        folder: PathBuf,
    },

    /// Archive sealed by this run
    ArchiveCreated {
        /// First volume of the archive
        archive: PathBuf,
        /// Number of volumes written
        volumes: usize,
    },

    /// Archive already existed, archiving skipped
    ArchiveExists {
        /// First volume of the archive
        archive: PathBuf,
    },

    /// Recovery data written
    RecoveryGenerated {
        /// Control file path
        output: PathBuf,
        /// Number of recovery files requested from the tool
        recovery_files: u64,
    },

    /// Recovery data already present, generation skipped
    RecoveryExists {
        /// Control file path
        output: PathBuf,
    },

    /// PAR2 verification started
    Verifying {
        /// Control file path
        par2: PathBuf,
    },

    /// PAR2 verification completed
    VerifyComplete {
        /// Control file path
        par2: PathBuf,
        /// Classified outcome
        outcome: VerificationOutcome,
    },

    /// PAR2 repair started
    Repairing {
        /// Control file path
        par2: PathBuf,
    },

    /// PAR2 repair completed
    RepairComplete {
        /// Control file path
        par2: PathBuf,
        /// Whether repair was successful
        success: bool,
    },

    /// Archive extraction started
    Extracting {
        /// Archive being extracted
        archive: PathBuf,
        /// Destination folder
        destination: PathBuf,
    },

    /// Archive extraction completed
    ExtractComplete {
        /// Archive that was extracted
        archive: PathBuf,
    },

    /// A unit was skipped without error
    Skipped {
        /// Folder or archive that was skipped
        path: PathBuf,
        /// Why it was skipped
        reason: String,
    },

    /// A unit failed; the batch continues unless the error is fatal
    Failed {
        /// Folder or archive that failed
        path: PathBuf,
        /// Stage that failed
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Duplicate moved into quarantine
    Quarantined {
        /// Original location
        from: PathBuf,
        /// New location inside the quarantine folder
        to: PathBuf,
    },
}
