//! Duplicate detection and quarantine
//!
//! Files are bucketed by size in a single walk; only buckets with more than
//! one member are hashed, and groups are formed on exact `(size, hash)`.
//! Redundant copies are moved into a quarantine folder, never deleted.

use crate::config::{DuplicateConfig, FileCollisionAction};
use crate::error::{Error, Result, io_at};
use crate::fingerprint::{ContentHash, Fingerprinter};
use crate::utils::{get_unique_path, move_file};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Files sharing the same size and content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Size of every member, in bytes
    pub size: u64,
    /// Content hash of every member
    pub hash: ContentHash,
    /// Members, sorted; always at least two
    pub paths: BTreeSet<PathBuf>,
}

impl DuplicateGroup {
    /// The copy that stays in place: shortest path, then lexicographically first
    pub fn keeper(&self) -> &Path {
        self.paths
            .iter()
            .min_by(|a, b| {
                a.as_os_str()
                    .len()
                    .cmp(&b.as_os_str().len())
                    .then_with(|| a.cmp(b))
            })
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Every member except the keeper
    pub fn redundant(&self) -> Vec<&Path> {
        let keeper = self.keeper();
        self.paths
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| *p != keeper)
            .collect()
    }
}

/// A file moved into quarantine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedFile {
    /// Original location
    pub from: PathBuf,
    /// Location inside the quarantine folder
    pub to: PathBuf,
}

/// A file that could not be quarantined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineFailure {
    /// File that stayed in place
    pub path: PathBuf,
    /// Reason
    pub error: String,
}

/// Outcome of quarantining every redundant member of a set of groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineReport {
    /// Files that were moved
    pub moved: Vec<QuarantinedFile>,
    /// Files that could not be moved
    pub failed: Vec<QuarantineFailure>,
}

/// Finds byte-identical files and moves redundant copies aside
pub struct DuplicateDetector {
    config: DuplicateConfig,
    fingerprinter: Fingerprinter,
}

/// Lowercased extensions without leading dots; empty means "any"
fn normalize_extensions(extensions: &[String]) -> BTreeSet<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn has_allowed_extension(path: &Path, allowed: &BTreeSet<String>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    path.extension()
        .map(|e| allowed.contains(&e.to_string_lossy().to_lowercase()))
        .unwrap_or(false)
}

impl DuplicateDetector {
    /// Create a detector with the given settings
    pub fn new(config: DuplicateConfig) -> Self {
        Self {
            config,
            fingerprinter: Fingerprinter,
        }
    }

    /// Extensions configured as the default filter
    pub fn default_extensions(&self) -> &[String] {
        &self.config.extensions
    }

    /// Find groups of identical files under `root`
    ///
    /// `allowed_extensions` are matched case-insensitively with or without a
    /// leading dot; an empty list accepts every file. Zero-byte files and the
    /// quarantine folder are skipped.
    ///
    /// # Errors
    ///
    /// `NotFound` when `root` does not exist, `InvalidPath` when it is not a
    /// directory.
    pub fn find_duplicates(
        &self,
        root: &Path,
        allowed_extensions: &[String],
    ) -> Result<Vec<DuplicateGroup>> {
        let metadata = std::fs::metadata(root).map_err(|e| io_at(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::InvalidPath {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let allowed = normalize_extensions(allowed_extensions);
        let quarantine_name = self.config.quarantine_dir_name.as_str();

        let mut by_size: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
        let mut scanned = 0u64;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == quarantine_name)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(?root, error = %e, "skipping unreadable entry during duplicate scan");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), &allowed) {
                continue;
            }
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = ?entry.path(), error = %e, "file vanished during duplicate scan");
                    continue;
                }
            };
            scanned += 1;
            if size == 0 {
                continue;
            }
            by_size.entry(size).or_default().push(entry.into_path());
        }

        let mut groups = Vec::new();
        let mut hashed = 0u64;
        for (size, candidates) in by_size {
            if candidates.len() < 2 {
                continue;
            }

            let mut by_hash: BTreeMap<ContentHash, BTreeSet<PathBuf>> = BTreeMap::new();
            for path in candidates {
                match self.fingerprinter.hash_file(&path) {
                    Ok(hash) => {
                        hashed += 1;
                        by_hash.entry(hash).or_default().insert(path);
                    }
                    Err(Error::NotFound(_)) => {
                        debug!(?path, "file vanished before hashing");
                    }
                    Err(e) => {
                        warn!(?path, error = %e, "could not hash file, skipping");
                    }
                }
            }

            groups.extend(
                by_hash
                    .into_iter()
                    .filter(|(_, paths)| paths.len() >= 2)
                    .map(|(hash, paths)| DuplicateGroup { size, hash, paths }),
            );
        }

        groups.sort_by(|a, b| a.keeper().cmp(b.keeper()));
        info!(
            ?root,
            scanned,
            hashed,
            groups = groups.len(),
            "duplicate scan complete"
        );
        Ok(groups)
    }

    /// Move `file` into the quarantine folder under `anchor_dir`
    ///
    /// The folder is created when needed; name collisions follow the
    /// configured [`FileCollisionAction`], except that `Overwrite` is handled
    /// as `Rename` so an earlier quarantined file is never replaced.
    /// Returns the new location.
    pub fn quarantine(&self, file: &Path, anchor_dir: &Path) -> Result<PathBuf> {
        let name = file.file_name().ok_or_else(|| Error::InvalidPath {
            path: file.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;
        if !file.exists() {
            return Err(Error::not_found(file));
        }

        let dir = anchor_dir.join(&self.config.quarantine_dir_name);
        std::fs::create_dir_all(&dir).map_err(|e| io_at(&dir, e))?;

        let action = match self.config.file_collision {
            FileCollisionAction::Overwrite => FileCollisionAction::Rename,
            action => action,
        };
        let destination = get_unique_path(&dir.join(name), action)?;
        move_file(file, &destination)?;
        debug!(?file, ?destination, "quarantined duplicate");
        Ok(destination)
    }

    /// Quarantine every redundant member of `groups` beside its current location
    ///
    /// Failures are recorded per file and do not stop the batch.
    pub fn quarantine_groups(&self, groups: &[DuplicateGroup]) -> QuarantineReport {
        let mut report = QuarantineReport::default();
        for group in groups {
            for file in group.redundant() {
                let anchor = file.parent().unwrap_or_else(|| Path::new("."));
                match self.quarantine(file, anchor) {
                    Ok(to) => report.moved.push(QuarantinedFile {
                        from: file.to_path_buf(),
                        to,
                    }),
                    Err(e) => {
                        warn!(?file, error = %e, "failed to quarantine duplicate");
                        report.failed.push(QuarantineFailure {
                            path: file.to_path_buf(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        info!(
            moved = report.moved.len(),
            failed = report.failed.len(),
            "quarantine complete"
        );
        report
    }
}
