//! Archive engine used when no 7-Zip binary can be located

use super::traits::{ArchiveCapabilities, ArchiveEngine, CreateOptions};
use async_trait::async_trait;
use std::path::Path;

/// Archive engine used when no 7-Zip binary is available or configured
///
/// Every operation fails with `Error::ToolNotFound`, which aborts the
/// surrounding protect or restore workflow instead of failing each folder.
pub struct UnavailableArchiveEngine;

impl UnavailableArchiveEngine {
    fn missing() -> crate::Error {
        crate::Error::tool_not_found("7z")
    }
}

#[async_trait]
impl ArchiveEngine for UnavailableArchiveEngine {
    async fn create(
        &self,
        _source_folder: &Path,
        _archive_path: &Path,
        _options: CreateOptions,
    ) -> crate::Result<()> {
        Err(Self::missing())
    }

    async fn test(&self, _archive_path: &Path) -> crate::Result<()> {
        Err(Self::missing())
    }

    async fn extract(&self, _archive_path: &Path, _dest_folder: &Path) -> crate::Result<()> {
        Err(Self::missing())
    }

    fn capabilities(&self) -> ArchiveCapabilities {
        ArchiveCapabilities {
            can_create: false,
            can_test: false,
            can_extract: false,
        }
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
