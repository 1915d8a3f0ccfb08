//! Workflows composing the archive, recovery, integrity and duplicate services
//!
//! The [`Orchestrator`] owns the external-tool adapters and exposes the
//! top-level operations:
//!
//! - [`protect_folder`](Orchestrator::protect_folder) /
//!   [`protect_tree`](Orchestrator::protect_tree): seal folders into archives
//!   and generate recovery data for them
//! - [`restore_archive`](Orchestrator::restore_archive) /
//!   [`restore_tree`](Orchestrator::restore_tree): verify, repair when needed,
//!   and extract
//! - [`deduplicate`](Orchestrator::deduplicate): find identical files and
//!   optionally quarantine redundant copies
//!
//! Units run one at a time. A missing external tool aborts a batch; any other
//! per-unit error is recorded and the batch moves on.

mod protect;
mod report;
mod restore;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use report::{
    DedupeReport, ProtectReport, RecoveryState, RestoreReport, TreeReport, UnitFailure,
};

use crate::archive::{ArchiveEngine, CliArchiveEngine, UnavailableArchiveEngine};
use crate::config::{ArchiveConfig, Config, ToolsConfig};
use crate::duplicates::DuplicateDetector;
use crate::error::Result;
use crate::integrity::IntegrityVerifier;
use crate::parity::{CliParityHandler, ParityHandler, UnavailableParityHandler};
use crate::recovery::RecoveryPlanner;
use crate::types::{Event, Stage};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Capacity of the event channel; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// External-tool adapters used by the workflows
#[derive(Clone)]
pub struct Tools {
    /// Compression engine
    pub archive: Arc<dyn ArchiveEngine>,
    /// Recovery-data tool
    pub parity: Arc<dyn ParityHandler>,
}

impl Tools {
    /// Resolve adapters from configuration
    ///
    /// An explicit path wins; otherwise PATH is searched when allowed; otherwise
    /// the unavailable adapter is used and every call fails with `ToolNotFound`.
    pub fn from_config(tools: &ToolsConfig, archive: &ArchiveConfig) -> Self {
        let archive_engine: Arc<dyn ArchiveEngine> = if let Some(ref path) = tools.sevenzip_path {
            Arc::new(CliArchiveEngine::new(path.clone(), archive.clone()))
        } else if tools.search_path {
            CliArchiveEngine::from_path(archive.clone())
                .map(|e| Arc::new(e) as Arc<dyn ArchiveEngine>)
                .unwrap_or_else(|| Arc::new(UnavailableArchiveEngine))
        } else {
            Arc::new(UnavailableArchiveEngine)
        };

        let parity: Arc<dyn ParityHandler> = if let Some(ref path) = tools.par2_path {
            Arc::new(CliParityHandler::new(path.clone(), tools.par2_dialect))
        } else if tools.search_path {
            CliParityHandler::from_path(tools.par2_dialect)
                .map(|h| Arc::new(h) as Arc<dyn ParityHandler>)
                .unwrap_or_else(|| Arc::new(UnavailableParityHandler::new(tools.par2_dialect)))
        } else {
            Arc::new(UnavailableParityHandler::new(tools.par2_dialect))
        };

        let archive_caps = archive_engine.capabilities();
        let parity_caps = parity.capabilities();
        info!(
            archive_engine = archive_engine.name(),
            can_extract = archive_caps.can_extract,
            parity_handler = parity.name(),
            can_repair = parity_caps.can_repair,
            "external tools initialized"
        );

        Self {
            archive: archive_engine,
            parity,
        }
    }
}

/// Runs the protect, restore and duplicate workflows
pub struct Orchestrator {
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    archive: Arc<dyn ArchiveEngine>,
    planner: RecoveryPlanner,
    verifier: IntegrityVerifier,
    duplicates: DuplicateDetector,
}

impl Orchestrator {
    /// Create an orchestrator with explicit adapters
    ///
    /// # Errors
    ///
    /// `Config` when the configuration fails validation.
    pub fn new(config: Config, tools: Tools) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            planner: RecoveryPlanner::new(tools.parity.clone(), config.recovery.clone()),
            verifier: IntegrityVerifier::new(tools.parity).with_events(event_tx.clone()),
            duplicates: DuplicateDetector::new(config.duplicates.clone()),
            archive: tools.archive,
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Create an orchestrator, resolving the external tools from `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let tools = Tools::from_config(&config.tools, &config.archive);
        Self::new(config, tools)
    }

    /// Subscribe to workflow events
    ///
    /// Each subscriber receives every event emitted after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Recovery planner, for callers that only need sizing
    pub fn planner(&self) -> &RecoveryPlanner {
        &self.planner
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine
        self.event_tx.send(event).ok();
    }

    /// Emit a `Failed` event for `path` and hand the error back
    pub(crate) fn report_failure(
        &self,
        path: &Path,
        stage: Stage,
        error: crate::Error,
    ) -> crate::Error {
        warn!(?path, ?stage, error = %error, "unit failed");
        self.emit_event(Event::Failed {
            path: path.to_path_buf(),
            stage,
            error: error.to_string(),
        });
        error
    }

    /// Find identical files under `root`, moving redundant copies aside when `quarantine` is set
    ///
    /// `extensions` overrides the configured filter.
    pub fn deduplicate(
        &self,
        root: &Path,
        extensions: Option<&[String]>,
        quarantine: bool,
    ) -> Result<DedupeReport> {
        let extensions = extensions.unwrap_or(self.duplicates.default_extensions());
        let groups = self.duplicates.find_duplicates(root, extensions)?;

        let quarantine = quarantine.then(|| {
            let report = self.duplicates.quarantine_groups(&groups);
            for moved in &report.moved {
                self.emit_event(Event::Quarantined {
                    from: moved.from.clone(),
                    to: moved.to.clone(),
                });
            }
            for failed in &report.failed {
                self.emit_event(Event::Failed {
                    path: failed.path.clone(),
                    stage: Stage::Quarantine,
                    error: failed.error.clone(),
                });
            }
            report
        });

        Ok(DedupeReport { groups, quarantine })
    }
}
