//! Configuration types for parvault

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// External tool paths (7z, par2) and discovery settings
///
/// Groups settings for external binaries.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Path to par2 executable (auto-detected if None)
    #[serde(default)]
    pub par2_path: Option<PathBuf>,

    /// Which par2 command-line dialect the binary speaks
    #[serde(default)]
    pub par2_dialect: Par2Dialect,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sevenzip_path: None,
            par2_path: None,
            par2_dialect: Par2Dialect::default(),
            search_path: true,
        }
    }
}

/// Command-line dialect of the recovery-data tool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Par2Dialect {
    /// MultiPar's `par2j64` (`/rr10 /sm4096 ...` switches, default)
    #[default]
    Par2j,
    /// par2cmdline (`-r10 -n2 ...` switches)
    Par2Cmdline,
}

impl Par2Dialect {
    /// Binary names searched in PATH for this dialect, in preference order
    pub fn binary_names(self) -> &'static [&'static str] {
        match self {
            Par2Dialect::Par2j => &["par2j64", "par2j"],
            Par2Dialect::Par2Cmdline => &["par2"],
        }
    }
}

/// Archive creation settings passed to the compression engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Compression level, 0-9 (default: 9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u8,

    /// Solid block / dictionary budget in 7z size syntax (default: "16g")
    #[serde(default = "default_solid_block_size")]
    pub solid_block_size: String,

    /// Per-volume size cap in 7z size syntax (default: "4092m")
    #[serde(default = "default_volume_size")]
    pub volume_size: String,

    /// Archive to a staging name, test it, then promote and delete sources (default: true)
    ///
    /// When false the engine deletes sources itself in the same invocation
    /// that writes the archive.
    #[serde(default = "default_true")]
    pub two_phase: bool,

    /// Remove archived source files once the archive is sealed (default: true)
    #[serde(default = "default_true")]
    pub delete_source: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            solid_block_size: default_solid_block_size(),
            volume_size: default_volume_size(),
            two_phase: true,
            delete_source: true,
        }
    }
}

/// Recovery-data sizing and generation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Share of the protected size allocated to recovery data, in percent (default: 10)
    #[serde(default = "default_redundancy_percent")]
    pub redundancy_percent: u32,

    /// Slice size factor handed to the tool (default: 4096)
    #[serde(default = "default_slice_size_factor")]
    pub slice_size_factor: u32,

    /// Largest single recovery file the tool may write, in bytes (default: 4,290,772,992)
    #[serde(default = "default_max_recovery_file_size")]
    pub max_recovery_file_size: u64,

    /// Parallelism hint for the tool (default: "256" = all cores plus GPU)
    #[serde(default = "default_parallelism")]
    pub parallelism: String,

    /// Check free space before generating recovery data (default: true)
    #[serde(default = "default_true")]
    pub check_disk_space: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            redundancy_percent: default_redundancy_percent(),
            slice_size_factor: default_slice_size_factor(),
            max_recovery_file_size: default_max_recovery_file_size(),
            parallelism: default_parallelism(),
            check_disk_space: true,
        }
    }
}

/// Duplicate detection and quarantine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DuplicateConfig {
    /// Extensions considered by the scan; empty means every file (default: png, jpg, mp4, mov)
    #[serde(default = "default_duplicate_extensions")]
    pub extensions: Vec<String>,

    /// Name of the quarantine subdirectory (default: "duplicates")
    #[serde(default = "default_quarantine_dir_name")]
    pub quarantine_dir_name: String,

    /// What to do when the quarantine already holds a file of the same name
    ///
    /// `overwrite` is rejected: quarantined files must stay recoverable.
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            extensions: default_duplicate_extensions(),
            quarantine_dir_name: default_quarantine_dir_name(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// Restore workflow settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Attempt a repair when verification finds repairable damage (default: true)
    #[serde(default = "default_true")]
    pub attempt_repair: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            attempt_repair: true,
        }
    }
}

/// Main configuration for parvault
///
/// Fields are organized into logical sub-configs:
/// - [`tools`](ToolsConfig): external binary paths and discovery
/// - [`archive`](ArchiveConfig): compression settings and the two-phase commit
/// - [`recovery`](RecoveryConfig): recovery-data sizing
/// - [`duplicates`](DuplicateConfig): duplicate scan filters and quarantine
/// - [`restore`](RestoreConfig): verify/repair/extract behaviour
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Archive creation settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Recovery-data settings
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Duplicate detection settings
    #[serde(default)]
    pub duplicates: DuplicateConfig,

    /// Restore settings
    #[serde(default)]
    pub restore: RestoreConfig,
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| crate::error::io_at(path, e))?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the external tools cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.recovery.redundancy_percent > 100 {
            return Err(Error::Config {
                message: format!(
                    "redundancy must be between 0 and 100 percent, got {}",
                    self.recovery.redundancy_percent
                ),
                key: Some("recovery.redundancy_percent".to_string()),
            });
        }
        if self.recovery.max_recovery_file_size == 0 {
            return Err(Error::Config {
                message: "maximum recovery file size must be greater than zero".to_string(),
                key: Some("recovery.max_recovery_file_size".to_string()),
            });
        }
        if self.recovery.slice_size_factor == 0 {
            return Err(Error::Config {
                message: "slice size factor must be greater than zero".to_string(),
                key: Some("recovery.slice_size_factor".to_string()),
            });
        }
        if self.archive.compression_level > 9 {
            return Err(Error::Config {
                message: format!(
                    "compression level must be between 0 and 9, got {}",
                    self.archive.compression_level
                ),
                key: Some("archive.compression_level".to_string()),
            });
        }
        if self.duplicates.quarantine_dir_name.trim().is_empty()
            || self.duplicates.quarantine_dir_name.contains(['/', '\\'])
        {
            return Err(Error::Config {
                message: "quarantine directory name must be a single non-empty path component"
                    .to_string(),
                key: Some("duplicates.quarantine_dir_name".to_string()),
            });
        }
        if self.duplicates.file_collision == FileCollisionAction::Overwrite {
            return Err(Error::Config {
                message: "quarantine never overwrites; use rename or skip".to_string(),
                key: Some("duplicates.file_collision".to_string()),
            });
        }
        Ok(())
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

fn default_true() -> bool {
    true
}

fn default_compression_level() -> u8 {
    9
}

fn default_solid_block_size() -> String {
    "16g".to_string()
}

fn default_volume_size() -> String {
    "4092m".to_string()
}

fn default_redundancy_percent() -> u32 {
    10
}

fn default_slice_size_factor() -> u32 {
    4096
}

fn default_max_recovery_file_size() -> u64 {
    4_290_772_992
}

fn default_parallelism() -> String {
    "256".to_string()
}

fn default_duplicate_extensions() -> Vec<String> {
    ["png", "jpg", "mp4", "mov"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_quarantine_dir_name() -> String {
    "duplicates".to_string()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tool_contract() {
        let config = Config::default();
        assert_eq!(config.recovery.redundancy_percent, 10);
        assert_eq!(config.recovery.slice_size_factor, 4096);
        assert_eq!(config.recovery.max_recovery_file_size, 4_290_772_992);
        assert_eq!(config.archive.compression_level, 9);
        assert_eq!(config.archive.volume_size, "4092m");
        assert!(config.archive.two_phase);
        assert_eq!(config.duplicates.quarantine_dir_name, "duplicates");
        assert_eq!(config.tools.par2_dialect, Par2Dialect::Par2j);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.recovery.redundancy_percent, 10);
        assert!(config.tools.search_path);
        assert!(config.restore.attempt_repair);
    }

    #[test]
    fn test_partial_json_overrides_only_given_fields() {
        let json = r#"{
            "recovery": { "redundancy_percent": 25 },
            "tools": { "par2_dialect": "par2_cmdline", "par2_path": "/usr/bin/par2" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.recovery.redundancy_percent, 25);
        assert_eq!(config.recovery.slice_size_factor, 4096);
        assert_eq!(config.tools.par2_dialect, Par2Dialect::Par2Cmdline);
        assert_eq!(config.tools.par2_path, Some(PathBuf::from("/usr/bin/par2")));
    }

    #[test]
    fn test_validate_rejects_out_of_range_redundancy() {
        let mut config = Config::default();
        config.recovery.redundancy_percent = 101;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("recovery.redundancy_percent"))
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_max_file_size() {
        let mut config = Config::default();
        config.recovery.max_recovery_file_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_nested_quarantine_name() {
        let mut config = Config::default();
        config.duplicates.quarantine_dir_name = "a/b".to_string();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_overwriting_quarantine() {
        let mut config = Config::default();
        config.duplicates.file_collision = FileCollisionAction::Overwrite;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("duplicates.file_collision"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_file_missing_is_not_found() {
        let result = Config::from_json_file(Path::new("/nonexistent/parvault.json"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_from_json_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("parvault.json");
        let mut config = Config::default();
        config.duplicates.extensions = vec!["cr2".to_string()];
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::from_json_file(&path).unwrap();
        assert_eq!(loaded.duplicates.extensions, vec!["cr2".to_string()]);
    }

    #[test]
    fn test_dialect_binary_names() {
        assert_eq!(Par2Dialect::Par2j.binary_names()[0], "par2j64");
        assert_eq!(Par2Dialect::Par2Cmdline.binary_names(), &["par2"]);
    }
}
