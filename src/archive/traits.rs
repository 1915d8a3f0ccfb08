//! Traits and types for archive engines

use async_trait::async_trait;
use std::path::Path;

/// Options for a single archive creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Let the engine delete the archived sources once the archive is written
    pub delete_source: bool,
}

/// Capabilities of an archive engine implementation
#[derive(Debug, Clone, Copy)]
pub struct ArchiveCapabilities {
    /// Can seal a folder into an archive
    pub can_create: bool,
    /// Can test an archive for readability
    pub can_test: bool,
    /// Can extract an archive
    pub can_extract: bool,
}

/// Trait for the external compression engine
///
/// The compression algorithm itself is never implemented here; adapters only
/// translate these calls into the engine's command contract.
#[async_trait]
pub trait ArchiveEngine: Send + Sync {
    /// Seal `source_folder` into `archive_path` (possibly multi-volume)
    ///
    /// # Errors
    ///
    /// - `NotFound` if the folder vanished before invocation
    /// - `ToolNotFound` if the engine binary is absent
    /// - `ToolExecutionFailed` if the engine exits non-zero
    async fn create(
        &self,
        source_folder: &Path,
        archive_path: &Path,
        options: CreateOptions,
    ) -> crate::Result<()>;

    /// Check that every volume of `archive_path` can be read back
    async fn test(&self, archive_path: &Path) -> crate::Result<()>;

    /// Extract `archive_path` into `dest_folder`, overwriting and preserving paths
    async fn extract(&self, archive_path: &Path, dest_folder: &Path) -> crate::Result<()>;

    /// Query capabilities of this engine
    fn capabilities(&self) -> ArchiveCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
