//! Traits and types for PAR2 parity handling

use crate::integrity::VerificationOutcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Everything the tool needs to generate recovery data
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Control file to write (`<anchor>.par2`)
    pub output: PathBuf,
    /// Absolute paths of the protected files
    pub sources: Vec<PathBuf>,
    /// Share of the protected size allocated to recovery data, in percent
    pub redundancy_percent: u32,
    /// Slice size factor
    pub slice_size_factor: u32,
    /// Number of recovery files to split the recovery data into
    pub recovery_file_count: u64,
    /// Parallelism hint understood by the tool
    pub parallelism: String,
}

/// Result of PAR2 verification
#[must_use]
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Classified outcome (`AllComplete`, `RepairableDamage` or `Unparseable`)
    pub outcome: VerificationOutcome,
    /// Number of damaged/missing blocks, when the tool reports it
    pub damaged_blocks: u32,
    /// Number of recovery blocks available, when the tool reports it
    pub recovery_blocks_available: u32,
    /// List of damaged files
    pub damaged_files: Vec<String>,
    /// List of missing files
    pub missing_files: Vec<String>,
    /// Verbatim combined output of the tool
    pub output: String,
}

/// Result of PAR2 repair
#[must_use]
#[derive(Debug, Clone)]
pub struct RepairReport {
    /// Classified outcome (`RepairSucceeded` or `RepairFailed`)
    pub outcome: VerificationOutcome,
    /// Files that were repaired
    pub repaired_files: Vec<String>,
    /// Files that could not be repaired
    pub failed_files: Vec<String>,
    /// Error message if repair failed
    pub error: Option<String>,
    /// Verbatim combined output of the tool
    pub output: String,
}

impl RepairReport {
    /// Whether the tool reported a successful reconstruction
    pub fn success(&self) -> bool {
        self.outcome == VerificationOutcome::RepairSucceeded
    }
}

/// Capabilities of a parity handler implementation
#[derive(Debug, Clone, Copy)]
pub struct ParityCapabilities {
    /// Can generate recovery data
    pub can_create: bool,
    /// Can verify file integrity
    pub can_verify: bool,
    /// Can repair damaged files
    pub can_repair: bool,
}

/// Trait for PAR2 parity handling
///
/// One implementation exists per tool dialect; all free-text interpretation of
/// the tool's report happens behind this trait, so a tool whose wording
/// changes only needs a new marker set.
#[async_trait]
pub trait ParityHandler: Send + Sync {
    /// Generate recovery data for `request.sources` into `request.output`
    ///
    /// # Errors
    ///
    /// - `ToolNotFound` if the binary is absent
    /// - `ToolExecutionFailed` if the tool exits non-zero
    async fn create(&self, request: &CreateRequest) -> crate::Result<()>;

    /// Verify integrity of files using PAR2
    ///
    /// Damage is not an error: it is reported through the outcome.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the control file does not exist
    /// - `ToolNotFound` if the binary is absent
    async fn verify(&self, par2_file: &Path) -> crate::Result<VerifyReport>;

    /// Attempt to repair damaged files using PAR2 recovery data
    ///
    /// # Errors
    ///
    /// - `NotFound` if the control file does not exist
    /// - `ToolNotFound` if the binary is absent
    async fn repair(&self, par2_file: &Path) -> crate::Result<RepairReport>;

    /// Query capabilities of this handler
    fn capabilities(&self) -> ParityCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
