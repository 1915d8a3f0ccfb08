//! Recovery-data planning and generation
//!
//! A [`RecoveryPlan`] sizes the recovery data for a set of protected paths;
//! the [`RecoveryPlanner`] turns a plan into files on disk through a
//! [`ParityHandler`].

use crate::config::RecoveryConfig;
use crate::error::{Error, Result};
use crate::parity::{CreateRequest, ParityHandler};
use crate::size::SizeAggregator;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extension appended to the anchor path to name the control file
pub const RECOVERY_EXTENSION: &str = "par2";

/// Sizing parameters for one recovery-data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    /// Share of the protected size allocated to recovery data, in percent
    pub redundancy_percent: u32,
    /// Slice size factor handed to the tool
    pub slice_size_factor: u32,
    /// Largest single recovery file, in bytes
    pub max_recovery_file_size: u64,
    /// Total size of the protected data, in bytes
    pub protected_byte_total: u64,
}

impl RecoveryPlan {
    /// Plan for `protected_byte_total` bytes using the configured sizing
    pub fn new(protected_byte_total: u64, config: &RecoveryConfig) -> Self {
        Self {
            redundancy_percent: config.redundancy_percent,
            slice_size_factor: config.slice_size_factor,
            max_recovery_file_size: config.max_recovery_file_size,
            protected_byte_total,
        }
    }

    /// Bytes of recovery data the plan asks for, rounded up
    pub fn estimated_recovery_bytes(&self) -> u64 {
        let wanted = u128::from(self.protected_byte_total) * u128::from(self.redundancy_percent);
        u64::try_from(wanted.div_ceil(100)).unwrap_or(u64::MAX)
    }

    /// Number of recovery files needed to stay under the per-file cap
    ///
    /// Zero when redundancy is zero, otherwise at least one. Files are not
    /// balanced: all but the last may be full-size.
    pub fn recovery_file_count(&self) -> u64 {
        if self.redundancy_percent == 0 {
            return 0;
        }
        if self.max_recovery_file_size == 0 {
            return 1;
        }
        let wanted = u128::from(self.protected_byte_total) * u128::from(self.redundancy_percent);
        let per_file = 100 * u128::from(self.max_recovery_file_size);
        let count = wanted.div_ceil(per_file).max(1);
        u64::try_from(count).unwrap_or(u64::MAX)
    }
}

/// Control-file path for a set of protected paths
///
/// The shortest path (ties broken lexicographically) with `.par2` appended,
/// so the control file lands beside the data it protects.
pub fn recovery_output_path(protected_paths: &[PathBuf]) -> Result<PathBuf> {
    let anchor = protected_paths
        .iter()
        .min_by(|a, b| {
            a.as_os_str()
                .len()
                .cmp(&b.as_os_str().len())
                .then_with(|| a.cmp(b))
        })
        .ok_or_else(|| Error::InvalidPath {
            path: PathBuf::new(),
            reason: "no protected paths given".to_string(),
        })?;

    let mut raw: OsString = anchor.as_os_str().to_os_string();
    raw.push(".");
    raw.push(RECOVERY_EXTENSION);
    Ok(PathBuf::from(raw))
}

/// Recovery data written by [`RecoveryPlanner::protect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRecovery {
    /// Control file written
    pub output: PathBuf,
    /// Plan the data was generated from
    pub plan: RecoveryPlan,
}

/// Sizes and generates recovery data through a parity tool
pub struct RecoveryPlanner {
    parity: Arc<dyn ParityHandler>,
    config: RecoveryConfig,
    sizes: SizeAggregator,
}

impl RecoveryPlanner {
    /// Create a planner driving `parity` with `config` defaults
    pub fn new(parity: Arc<dyn ParityHandler>, config: RecoveryConfig) -> Self {
        Self {
            parity,
            config,
            sizes: SizeAggregator,
        }
    }

    /// Configured defaults used by [`protect`](Self::protect)
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Build a plan for `protected_paths` with explicit sizing
    ///
    /// # Errors
    ///
    /// `NotFound` when a protected path does not exist.
    pub fn plan(
        &self,
        protected_paths: &[PathBuf],
        redundancy_percent: u32,
        slice_size_factor: u32,
        max_recovery_file_size: u64,
    ) -> Result<RecoveryPlan> {
        let protected_byte_total = self.sizes.size_of_set(protected_paths.iter().cloned())?;
        let plan = RecoveryPlan {
            redundancy_percent,
            slice_size_factor,
            max_recovery_file_size,
            protected_byte_total,
        };
        debug!(
            protected_byte_total,
            recovery_files = plan.recovery_file_count(),
            "planned recovery data"
        );
        Ok(plan)
    }

    /// Generate recovery data for `protected_paths` into `output`
    ///
    /// # Errors
    ///
    /// - `InvalidPath` for an empty list or any relative path
    /// - `NotFound` when a protected path is missing
    /// - `OutputAlreadyExists` when `output` is already on disk
    /// - `InsufficientSpace` when the output directory cannot hold the estimate
    /// - whatever the parity tool reports (`ToolNotFound`, `ToolExecutionFailed`)
    pub async fn generate(
        &self,
        plan: &RecoveryPlan,
        protected_paths: &[PathBuf],
        output: &Path,
    ) -> Result<()> {
        if protected_paths.is_empty() {
            return Err(Error::InvalidPath {
                path: output.to_path_buf(),
                reason: "no protected paths given".to_string(),
            });
        }
        for path in protected_paths {
            if !path.is_absolute() {
                return Err(Error::InvalidPath {
                    path: path.clone(),
                    reason: "protected paths must be absolute".to_string(),
                });
            }
            if !path.exists() {
                return Err(Error::not_found(path));
            }
        }
        if output.exists() {
            return Err(Error::OutputAlreadyExists(output.to_path_buf()));
        }

        if self.config.check_disk_space {
            self.check_disk_space(plan, output)?;
        }

        let request = CreateRequest {
            output: output.to_path_buf(),
            sources: protected_paths.to_vec(),
            redundancy_percent: plan.redundancy_percent,
            slice_size_factor: plan.slice_size_factor,
            recovery_file_count: plan.recovery_file_count(),
            parallelism: self.config.parallelism.clone(),
        };
        self.parity.create(&request).await?;

        info!(
            ?output,
            sources = protected_paths.len(),
            recovery_files = request.recovery_file_count,
            handler = self.parity.name(),
            "recovery data generated"
        );
        Ok(())
    }

    /// Plan with the configured sizing and generate beside the data
    ///
    /// Relative paths are made absolute against the current directory first.
    pub async fn protect(&self, protected_paths: &[PathBuf]) -> Result<GeneratedRecovery> {
        let absolute = protected_paths
            .iter()
            .map(|p| std::path::absolute(p).map_err(|e| crate::error::io_at(p, e)))
            .collect::<Result<Vec<_>>>()?;

        let output = recovery_output_path(&absolute)?;
        let plan = self.plan(
            &absolute,
            self.config.redundancy_percent,
            self.config.slice_size_factor,
            self.config.max_recovery_file_size,
        )?;
        self.generate(&plan, &absolute, &output).await?;
        Ok(GeneratedRecovery { output, plan })
    }

    fn check_disk_space(&self, plan: &RecoveryPlan, output: &Path) -> Result<()> {
        let required = plan.estimated_recovery_bytes();
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        match crate::utils::get_available_space(dir) {
            Ok(available) if available < required => {
                Err(Error::InsufficientSpace {
                    required,
                    available,
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(?dir, error = %e, "disk space check failed, continuing");
                Ok(())
            }
        }
    }
}
