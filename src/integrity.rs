//! Integrity verification and repair of protected archives
//!
//! Verification is a small state machine:
//!
//! ```text
//! Unverified ──verify──▶ AllComplete
//!            ├─────────▶ Unparseable
//!            └─────────▶ RepairableDamage ──repair──▶ RepairSucceeded
//!                                         └─────────▶ RepairFailed
//! ```
//!
//! Only `AllComplete` and `RepairSucceeded` allow the archive to be extracted.

use crate::error::{Error, Result};
use crate::parity::{ParityHandler, RepairReport, VerifyReport};
use crate::types::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Result of verifying (and possibly repairing) protected data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Every protected file is intact
    AllComplete,
    /// Damage found that the recovery data can fix
    RepairableDamage,
    /// Repair rebuilt the damaged files
    RepairSucceeded,
    /// Repair was attempted and did not succeed
    RepairFailed,
    /// The tool's report matched no known marker
    Unparseable,
}

impl VerificationOutcome {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::RepairableDamage)
    }

    /// Whether the protected data may be extracted in this state
    pub fn allows_extraction(self) -> bool {
        matches!(self, Self::AllComplete | Self::RepairSucceeded)
    }

    /// Apply a repair result to this state
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `self` is `RepairableDamage` and
    /// `repair_outcome` is `RepairSucceeded` or `RepairFailed`.
    pub fn after_repair(self, repair_outcome: VerificationOutcome) -> Result<Self> {
        match (self, repair_outcome) {
            (Self::RepairableDamage, Self::RepairSucceeded | Self::RepairFailed) => {
                Ok(repair_outcome)
            }
            (from, to) => Err(Error::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AllComplete => "all_complete",
            Self::RepairableDamage => "repairable_damage",
            Self::RepairSucceeded => "repair_succeeded",
            Self::RepairFailed => "repair_failed",
            Self::Unparseable => "unparseable",
        };
        write!(f, "{}", s)
    }
}

/// Everything learned while checking one control file
#[derive(Debug, Clone)]
pub struct IntegrityCheck {
    /// Final state reached
    pub outcome: VerificationOutcome,
    /// Verification report
    pub verify: VerifyReport,
    /// Repair report, when a repair was attempted
    pub repair: Option<RepairReport>,
}

impl IntegrityCheck {
    /// Raw tool output of the last step, for reporting unparseable or failed runs
    pub fn last_output(&self) -> &str {
        match &self.repair {
            Some(repair) => &repair.output,
            None => &self.verify.output,
        }
    }
}

/// Verifies and repairs protected data through a parity tool
pub struct IntegrityVerifier {
    parity: Arc<dyn ParityHandler>,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl IntegrityVerifier {
    /// Create a verifier driving `parity`
    pub fn new(parity: Arc<dyn ParityHandler>) -> Self {
        Self {
            parity,
            event_tx: None,
        }
    }

    /// Emit verify and repair progress on `event_tx` during [`check_detailed`](Self::check_detailed)
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    fn emit_event(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            // no receivers is fine
            tx.send(event).ok();
        }
    }

    fn require_control_file(par2_file: &Path) -> Result<()> {
        if par2_file.is_file() {
            Ok(())
        } else {
            Err(Error::not_found(par2_file))
        }
    }

    /// Verify the data described by `par2_file`
    ///
    /// # Errors
    ///
    /// `NotFound` if the control file is missing; `ToolNotFound` if the tool is
    /// absent. Damage and unrecognised reports are outcomes, not errors.
    pub async fn verify(&self, par2_file: &Path) -> Result<VerifyReport> {
        Self::require_control_file(par2_file)?;
        debug!(?par2_file, handler = self.parity.name(), "verifying");
        self.parity.verify(par2_file).await
    }

    /// Repair the data described by `par2_file`
    pub async fn repair(&self, par2_file: &Path) -> Result<RepairReport> {
        Self::require_control_file(par2_file)?;
        debug!(?par2_file, handler = self.parity.name(), "repairing");
        self.parity.repair(par2_file).await
    }

    /// Verify, then repair when damage is repairable and `attempt_repair` is set
    pub async fn check_detailed(
        &self,
        par2_file: &Path,
        attempt_repair: bool,
    ) -> Result<IntegrityCheck> {
        Self::require_control_file(par2_file)?;
        self.emit_event(Event::Verifying {
            par2: par2_file.to_path_buf(),
        });
        let verify = self.verify(par2_file).await?;
        let mut outcome = verify.outcome;
        self.emit_event(Event::VerifyComplete {
            par2: par2_file.to_path_buf(),
            outcome,
        });

        if outcome.is_terminal() || !attempt_repair {
            match outcome {
                VerificationOutcome::AllComplete => info!(?par2_file, "all files complete"),
                VerificationOutcome::Unparseable => {
                    warn!(?par2_file, "verification report not recognised")
                }
                _ => warn!(?par2_file, %outcome, "verification finished without repair"),
            }
            return Ok(IntegrityCheck {
                outcome,
                verify,
                repair: None,
            });
        }

        info!(
            ?par2_file,
            damaged_blocks = verify.damaged_blocks,
            recovery_blocks = verify.recovery_blocks_available,
            "damage is repairable, repairing"
        );
        self.emit_event(Event::Repairing {
            par2: par2_file.to_path_buf(),
        });
        let repair = self.repair(par2_file).await?;
        outcome = outcome.after_repair(repair.outcome)?;
        self.emit_event(Event::RepairComplete {
            par2: par2_file.to_path_buf(),
            success: repair.success(),
        });

        if outcome == VerificationOutcome::RepairSucceeded {
            info!(?par2_file, repaired = ?repair.repaired_files, "repair succeeded");
        } else {
            warn!(?par2_file, error = ?repair.error, "repair failed");
        }

        Ok(IntegrityCheck {
            outcome,
            verify,
            repair: Some(repair),
        })
    }

    /// Drive the full state machine and return the final state
    pub async fn check(&self, par2_file: &Path, attempt_repair: bool) -> Result<VerificationOutcome> {
        Ok(self.check_detailed(par2_file, attempt_repair).await?.outcome)
    }
}
