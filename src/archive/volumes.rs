//! Naming and discovery of sealed-archive volumes
//!
//! A sealed archive is either a single `name.7z` or a numbered set
//! `name.7z.001`, `name.7z.002`, ... The first volume is the entry point the
//! engine is pointed at, and the name recovery files are paired against.

use crate::error::{Result, io_at};
use crate::utils::file_name_str;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extension of sealed archives
pub const ARCHIVE_EXTENSION: &str = "7z";

/// Suffix of an archive that has not been tested and promoted yet
///
/// Staging archives are also dot-prefixed, so their volumes never end in
/// `.7z` or `.7z.NNN` and cannot be mistaken for a sealed archive.
const STAGING_SUFFIX: &str = ".staging";

/// Final archive path for `folder`: `<folder>/<folder-name>.7z`
pub fn archive_path_for(folder: &Path) -> Result<PathBuf> {
    let name = file_name_str(folder)?;
    Ok(folder.join(format!("{}.{}", name, ARCHIVE_EXTENSION)))
}

/// Staging archive path for `folder`: `<folder>/.<folder-name>.7z.staging`
pub fn staging_path_for(folder: &Path) -> Result<PathBuf> {
    let name = file_name_str(folder)?;
    Ok(folder.join(format!(".{}.{}{}", name, ARCHIVE_EXTENSION, STAGING_SUFFIX)))
}

/// Whether `name` is `base` itself or `base.NNN`
fn is_volume_of(name: &str, base: &str) -> bool {
    if name == base {
        return true;
    }
    match name.strip_prefix(base).and_then(|rest| rest.strip_prefix('.')) {
        Some(number) => !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// All volumes belonging to `archive_path`, sorted so the entry point comes first
///
/// Returns an empty list when no volume exists yet.
pub fn find_volumes(archive_path: &Path) -> Result<Vec<PathBuf>> {
    let base = file_name_str(archive_path)?;
    let parent = archive_path.parent().unwrap_or_else(|| Path::new("."));

    let entries = match std::fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_at(parent, e)),
    };

    let mut volumes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_at(parent, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_volume_of(name, base) && entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            volumes.push(entry.path());
        }
    }
    volumes.sort();
    Ok(volumes)
}

/// Whether `path` names the entry point of a sealed archive (`.7z` or `.7z.001`)
pub fn is_archive_entry_point(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    name.ends_with(".7z") || name.ends_with(".7z.001")
}

/// Remove a trailing `.7z` or `.7z.001` (case-insensitive); other paths are returned unchanged
pub fn strip_archive_extension(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let lower = raw.to_lowercase();
    for suffix in [".7z.001", ".7z"] {
        if lower.ends_with(suffix) {
            return PathBuf::from(&raw[..raw.len() - suffix.len()]);
        }
    }
    path.to_path_buf()
}

/// Control files that may protect the archive whose entry point is `entry_point`, in lookup order
///
/// `x.7z` pairs with `x.7z.par2`; `x.7z.001` pairs with `x.7z.par2` or
/// `x.7z.001.par2` (the latter is what recovery generation names it).
pub fn recovery_candidates(entry_point: &Path) -> Vec<PathBuf> {
    let stem = strip_archive_extension(entry_point);
    let mut candidates = vec![append_extension(&stem, ".7z.par2")];
    let own = append_extension(entry_point, ".par2");
    if !candidates.contains(&own) {
        candidates.push(own);
    }
    candidates
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}

/// Every archive entry point under `root`, in walk order (sorted by file name)
///
/// Unreadable entries are logged and skipped.
pub fn find_archives(root: &Path) -> Result<Vec<PathBuf>> {
    std::fs::metadata(root).map_err(|e| io_at(root, e))?;

    let mut archives = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(?root, error = %e, "skipping unreadable entry while searching archives");
                continue;
            }
        };
        if entry.file_type().is_file() && is_archive_entry_point(entry.path()) {
            archives.push(entry.into_path());
        }
    }
    Ok(archives)
}

/// Rename every volume of `staging` to the matching volume name of `target`
///
/// Returns the promoted volumes, sorted. When a rename fails, the volumes
/// already renamed are moved back so no partial archive is left under the
/// target name.
pub fn promote_volumes(staging: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let staging_base = file_name_str(staging)?.to_string();
    let target_base = file_name_str(target)?.to_string();
    let parent = target.parent().unwrap_or_else(|| Path::new("."));

    let mut renamed: Vec<(PathBuf, PathBuf)> = Vec::new();
    for volume in find_volumes(staging)? {
        let name = file_name_str(&volume)?;
        let suffix = &name[staging_base.len()..];
        let destination = parent.join(format!("{}{}", target_base, suffix));
        if let Err(e) = std::fs::rename(&volume, &destination) {
            roll_back(&renamed);
            return Err(io_at(&volume, e));
        }
        renamed.push((volume, destination));
    }

    let mut promoted: Vec<PathBuf> = renamed.into_iter().map(|(_, to)| to).collect();
    promoted.sort();
    Ok(promoted)
}

/// Undo completed renames, newest first
fn roll_back(renamed: &[(PathBuf, PathBuf)]) {
    for (from, to) in renamed.iter().rev() {
        if let Err(e) = std::fs::rename(to, from) {
            warn!(volume = ?to, error = %e, "could not roll back promoted volume");
        }
    }
}

/// Delete every volume of `archive_path`, returning how many were removed
pub fn remove_volumes(archive_path: &Path) -> Result<usize> {
    let volumes = find_volumes(archive_path)?;
    for volume in &volumes {
        std::fs::remove_file(volume).map_err(|e| io_at(volume, e))?;
    }
    Ok(volumes.len())
}
