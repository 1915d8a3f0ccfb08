//! CLI-based PAR2 handler using an external par2 binary

use super::parser::{ExitStatus, MarkerSet, parse_repair_output, parse_verify_output};
use super::traits::{CreateRequest, ParityCapabilities, ParityHandler, RepairReport, VerifyReport};
use crate::config::Par2Dialect;
use crate::error::Error;
use crate::utils::{ToolOutput, file_name_str, run_tool};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// CLI-based PAR2 handler using an external par2 binary
///
/// The dialect decides both the switches passed on creation and the marker
/// set used to classify verify and repair reports.
///
/// # Examples
///
/// ```no_run
/// use parvault::config::Par2Dialect;
/// use parvault::parity::{CliParityHandler, ParityHandler};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let handler = CliParityHandler::new(PathBuf::from("/usr/bin/par2"), Par2Dialect::Par2Cmdline);
///
/// // Or auto-discover from PATH
/// let handler = CliParityHandler::from_path(Par2Dialect::Par2j)
///     .expect("par2j64 not found in PATH");
///
/// let report = handler.verify(Path::new("/photos/2005/2005.7z.001.par2")).await?;
/// # Ok(())
/// # }
/// ```
pub struct CliParityHandler {
    binary_path: PathBuf,
    dialect: Par2Dialect,
    markers: MarkerSet,
}

impl CliParityHandler {
    /// Create a new CLI handler with an explicit binary path
    pub fn new(binary_path: PathBuf, dialect: Par2Dialect) -> Self {
        Self {
            binary_path,
            dialect,
            markers: MarkerSet::for_dialect(dialect),
        }
    }

    /// Attempt to find a binary for `dialect` in PATH
    pub fn from_path(dialect: Par2Dialect) -> Option<Self> {
        dialect
            .binary_names()
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|path| Self::new(path, dialect))
    }

    /// Path of the binary this handler runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Dialect spoken by the binary
    pub fn dialect(&self) -> Par2Dialect {
        self.dialect
    }

    fn tool_name(&self) -> String {
        self.binary_path.display().to_string()
    }

    /// Arguments for `c` (create) in this handler's dialect
    pub(crate) fn create_args(&self, request: &CreateRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["c".into()];
        match self.dialect {
            Par2Dialect::Par2j => {
                args.push(format!("/rr{}", request.redundancy_percent).into());
                args.push(format!("/sm{}", request.slice_size_factor).into());
                // recovery files next to the sources
                args.push("/rd0".into());
                args.push(format!("/rf{}", request.recovery_file_count).into());
                args.push(format!("/lc{}", request.parallelism).into());
            }
            Par2Dialect::Par2Cmdline => {
                args.push(format!("-r{}", request.redundancy_percent).into());
                if request.recovery_file_count > 0 {
                    args.push(format!("-n{}", request.recovery_file_count).into());
                }
                args.push("--".into());
            }
        }
        args.push(request.output.clone().into());
        args.extend(request.sources.iter().map(|s| s.clone().into_os_string()));
        args
    }

    /// Run `mode` (`v` or `r`) against a control file from inside its directory
    async fn run_in_place(&self, mode: &str, par2_file: &Path) -> crate::Result<ToolOutput> {
        if !par2_file.is_file() {
            return Err(Error::not_found(par2_file));
        }
        let name = file_name_str(par2_file)?;
        let dir = match par2_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        debug!(?par2_file, mode, binary = ?self.binary_path, "running parity tool");
        run_tool(
            Command::new(&self.binary_path)
                .arg(mode)
                .arg(name)
                .current_dir(dir),
            &self.tool_name(),
        )
        .await
    }
}

#[async_trait]
impl ParityHandler for CliParityHandler {
    async fn create(&self, request: &CreateRequest) -> crate::Result<()> {
        let args = self.create_args(request);
        debug!(output = ?request.output, sources = request.sources.len(), ?args, "running parity create");

        let tool = self.tool_name();
        run_tool(Command::new(&self.binary_path).args(&args), &tool)
            .await?
            .require_success(&tool)?;
        Ok(())
    }

    async fn verify(&self, par2_file: &Path) -> crate::Result<VerifyReport> {
        // damage is reported with a non-zero exit, so the status is not checked
        let output = self.run_in_place("v", par2_file).await?;
        Ok(parse_verify_output(&output.stdout, &output.stderr, &self.markers))
    }

    async fn repair(&self, par2_file: &Path) -> crate::Result<RepairReport> {
        let output = self.run_in_place("r", par2_file).await?;
        Ok(parse_repair_output(
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.success),
            &self.markers,
        ))
    }

    fn capabilities(&self) -> ParityCapabilities {
        ParityCapabilities {
            can_create: true,
            can_verify: true,
            can_repair: true,
        }
    }

    fn name(&self) -> &'static str {
        match self.dialect {
            Par2Dialect::Par2j => "cli-par2j",
            Par2Dialect::Par2Cmdline => "cli-par2",
        }
    }
}
