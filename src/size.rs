//! Byte-size aggregation over files, folders, and containment-deduplicated path sets

use crate::error::{Result, io_at};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A set of filesystem paths with no ancestor/descendant pairs
///
/// Built with [`PathSet::resolve`]. Containment is decided on path components,
/// so `/a/b` contains `/a/b/c` but not `/a/bc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    paths: BTreeSet<PathBuf>,
}

impl PathSet {
    /// Drop every path that has a proper ancestor elsewhere in the input
    pub fn resolve<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let unique: BTreeSet<PathBuf> = paths.into_iter().map(Into::into).collect();

        // BTreeSet order puts every ancestor before its descendants, so a path
        // is contained iff it starts with the most recently kept root.
        let mut kept: BTreeSet<PathBuf> = BTreeSet::new();
        let mut last_root: Option<PathBuf> = None;
        for path in unique {
            if let Some(root) = &last_root
                && path.starts_with(root)
            {
                continue;
            }
            last_root = Some(path.clone());
            kept.insert(path);
        }

        Self { paths: kept }
    }

    /// Iterate over the resolved paths in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Number of resolved paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `path` is one of the resolved roots
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}

impl IntoIterator for PathSet {
    type Item = PathBuf;
    type IntoIter = std::collections::btree_set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

/// Outcome of a recursive directory walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSize {
    /// Total bytes of the regular files that could be read
    pub bytes: u64,
    /// Entries that vanished or could not be read during the walk
    pub skipped: u64,
}

/// Stateless service computing file, folder, and path-set sizes
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeAggregator;

impl SizeAggregator {
    /// Size of a single file, or the recursive size of a directory
    ///
    /// Fails with `NotFound` when `path` does not exist at call time.
    /// Entries that disappear during a directory walk are skipped.
    pub fn size_of(&self, path: &Path) -> Result<u64> {
        let metadata = std::fs::symlink_metadata(path).map_err(|e| io_at(path, e))?;
        if metadata.is_dir() {
            Ok(self.walk_size(path)?.bytes)
        } else {
            Ok(metadata.len())
        }
    }

    /// Sum of [`size_of`](Self::size_of) over the containment-resolved set
    pub fn size_of_set<I, P>(&self, paths: I) -> Result<u64>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let resolved = PathSet::resolve(paths);
        let mut total = 0u64;
        for path in resolved.iter() {
            total = total.saturating_add(self.size_of(path)?);
        }
        debug!(roots = resolved.len(), total, "computed path set size");
        Ok(total)
    }

    /// Walk `dir` recursively, summing regular files and counting skipped entries
    ///
    /// Symlinks are not followed.
    pub fn walk_size(&self, dir: &Path) -> Result<WalkSize> {
        std::fs::symlink_metadata(dir).map_err(|e| io_at(dir, e))?;

        let mut size = WalkSize::default();
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "skipping unreadable entry during size walk");
                    size.skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => size.bytes = size.bytes.saturating_add(metadata.len()),
                Err(e) => {
                    warn!(path = ?entry.path(), error = %e, "file vanished during size walk");
                    size.skipped += 1;
                }
            }
        }
        Ok(size)
    }
}
