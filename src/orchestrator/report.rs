//! Reports returned by the workflows

use crate::duplicates::{DuplicateGroup, QuarantineReport};
use crate::integrity::VerificationOutcome;
use crate::recovery::RecoveryPlan;
use crate::types::ArchiveJob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to the recovery data of a protected folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecoveryState {
    /// Recovery data was generated in this run
    Generated {
        /// Control file written
        output: PathBuf,
        /// Plan the data was generated from
        plan: RecoveryPlan,
    },
    /// Recovery data was already present
    AlreadyPresent {
        /// Existing control file
        output: PathBuf,
    },
}

impl RecoveryState {
    /// Control file protecting the archive
    pub fn output(&self) -> &PathBuf {
        match self {
            Self::Generated { output, .. } | Self::AlreadyPresent { output } => output,
        }
    }
}

/// Outcome of protecting one folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectReport {
    /// Archive job with its final status (`Created` or `AlreadyExists`)
    pub job: ArchiveJob,
    /// Archive volumes on disk, entry point first
    pub volumes: Vec<PathBuf>,
    /// Recovery data state
    pub recovery: RecoveryState,
}

/// Outcome of restoring one archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Archive entry point
    pub archive: PathBuf,
    /// Control file that vouched for it
    pub par2: PathBuf,
    /// Final integrity state (`AllComplete` or `RepairSucceeded`)
    pub outcome: VerificationOutcome,
    /// Folder the archive was extracted into
    pub destination: PathBuf,
}

/// Outcome of a duplicate scan, with the quarantine step when requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeReport {
    /// Groups of identical files
    pub groups: Vec<DuplicateGroup>,
    /// Files moved aside, when quarantine was requested
    pub quarantine: Option<QuarantineReport>,
}

/// A unit of a batch that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Folder or archive the unit worked on
    pub path: PathBuf,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error
    pub error: String,
}

impl UnitFailure {
    pub(crate) fn new(path: PathBuf, error: &crate::Error) -> Self {
        Self {
            path,
            code: error.error_code().to_string(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a batch over a directory tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeReport<T> {
    /// Tree that was processed
    pub root: PathBuf,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the batch finished
    pub finished_at: DateTime<Utc>,
    /// Units that completed
    pub completed: Vec<T>,
    /// Units that failed; the batch continued past them
    pub failures: Vec<UnitFailure>,
}

impl<T> TreeReport<T> {
    pub(crate) fn start(root: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            root,
            started_at: now,
            finished_at: now,
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Whether every unit completed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
