//! CLI-based archive engine using an external 7-Zip binary

use super::traits::{ArchiveCapabilities, ArchiveEngine, CreateOptions};
use crate::config::ArchiveConfig;
use crate::error::Error;
use crate::utils::run_tool;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Binary names searched in PATH, in preference order
const SEVENZIP_BINARIES: &[&str] = &["7z", "7zz", "7za"];

/// CLI-based archive engine using an external 7-Zip binary
///
/// # Examples
///
/// ```no_run
/// use parvault::archive::{ArchiveEngine, CliArchiveEngine, CreateOptions};
/// use parvault::config::ArchiveConfig;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CliArchiveEngine::from_path(ArchiveConfig::default())
///     .expect("7z not found in PATH");
///
/// engine
///     .create(
///         Path::new("/photos/2005"),
///         Path::new("/photos/2005/2005.7z"),
///         CreateOptions::default(),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CliArchiveEngine {
    binary_path: PathBuf,
    settings: ArchiveConfig,
}

impl CliArchiveEngine {
    /// Create a new CLI engine with an explicit binary path
    pub fn new(binary_path: PathBuf, settings: ArchiveConfig) -> Self {
        Self {
            binary_path,
            settings,
        }
    }

    /// Attempt to find a 7-Zip binary in PATH
    ///
    /// Tries `7z`, `7zz` and `7za` in that order.
    pub fn from_path(settings: ArchiveConfig) -> Option<Self> {
        SEVENZIP_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|path| Self::new(path, settings))
    }

    /// Path of the binary this engine runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn tool_name(&self) -> String {
        self.binary_path.display().to_string()
    }

    /// Arguments for `a` (add): max compression, solid budget, volume cap,
    /// full-path storage, optional source deletion
    ///
    /// The archive lives inside the folder it seals, so its own volumes are
    /// excluded from the input.
    pub(crate) fn create_args(
        &self,
        source_folder: &Path,
        archive_path: &Path,
        options: CreateOptions,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "a".into(),
            "-t7z".into(),
            format!("-mx{}", self.settings.compression_level).into(),
            format!("-ms{}", self.settings.solid_block_size).into(),
            format!("-v{}", self.settings.volume_size).into(),
            "-ssp".into(),
            "-stl".into(),
            "-spe".into(),
        ];
        if options.delete_source {
            args.push("-sdel".into());
        }
        if let Some(name) = archive_path.file_name() {
            let mut exclude = OsString::from("-xr!");
            exclude.push(name);
            exclude.push(".*");
            args.push(exclude);
        }
        args.push(archive_path.into());
        args.push(source_folder.into());
        args
    }

    /// Arguments for `x` (extract with full paths): overwrite all, output directory
    pub(crate) fn extract_args(archive_path: &Path, dest_folder: &Path) -> Vec<OsString> {
        let mut output_flag = OsString::from("-o");
        output_flag.push(dest_folder);
        vec![
            "x".into(),
            archive_path.into(),
            output_flag,
            "-y".into(),
            "-spe".into(),
        ]
    }
}

#[async_trait]
impl ArchiveEngine for CliArchiveEngine {
    async fn create(
        &self,
        source_folder: &Path,
        archive_path: &Path,
        options: CreateOptions,
    ) -> crate::Result<()> {
        if !source_folder.exists() {
            return Err(Error::not_found(source_folder));
        }

        let args = self.create_args(source_folder, archive_path, options);
        debug!(?source_folder, ?archive_path, ?args, "running 7z create");

        let tool = self.tool_name();
        run_tool(Command::new(&self.binary_path).args(&args), &tool)
            .await?
            .require_success(&tool)?;
        Ok(())
    }

    async fn test(&self, archive_path: &Path) -> crate::Result<()> {
        if !archive_path.exists() {
            return Err(Error::not_found(archive_path));
        }

        let tool = self.tool_name();
        run_tool(
            Command::new(&self.binary_path).arg("t").arg(archive_path),
            &tool,
        )
        .await?
        .require_success(&tool)?;
        Ok(())
    }

    async fn extract(&self, archive_path: &Path, dest_folder: &Path) -> crate::Result<()> {
        if !archive_path.exists() {
            return Err(Error::not_found(archive_path));
        }

        let args = Self::extract_args(archive_path, dest_folder);
        debug!(?archive_path, ?dest_folder, "running 7z extract");

        let tool = self.tool_name();
        run_tool(Command::new(&self.binary_path).args(&args), &tool)
            .await?
            .require_success(&tool)?;
        Ok(())
    }

    fn capabilities(&self) -> ArchiveCapabilities {
        ArchiveCapabilities {
            can_create: true,
            can_test: true,
            can_extract: true,
        }
    }

    fn name(&self) -> &'static str {
        "cli-7z"
    }
}
