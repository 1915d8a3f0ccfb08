//! In-process stand-ins for 7-Zip and the PAR2 client
//!
//! The archive fake stores a folder as a JSON manifest in `<archive>.001`;
//! the parity fake keeps a full copy of every protected file inside the
//! control file, so "repair" simply rewrites the originals.

use async_trait::async_trait;
use parvault::archive::CreateOptions;
use parvault::parity::{
    CreateRequest, ExitStatus, MarkerSet, parse_repair_output, parse_verify_output,
};
use parvault::{
    ArchiveCapabilities, ArchiveEngine, Error, ParityCapabilities, ParityHandler, RepairReport,
    Result, VerifyReport,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

#[derive(Serialize, Deserialize)]
struct ArchiveManifest {
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct ParityManifest {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

fn corrupt_archive() -> Error {
    Error::ToolExecutionFailed {
        tool: "manifest-7z".to_string(),
        code: Some(2),
        output: "ERROR: Headers Error".to_string(),
    }
}

fn read_manifest(archive: &Path) -> Result<ArchiveManifest> {
    serde_json::from_slice(&fs::read(archive)?).map_err(|_| corrupt_archive())
}

/// Entry names stored in a manifest volume, as `<top>/<relative path>`
pub fn archived_files(volume: &Path) -> Result<Vec<String>> {
    Ok(read_manifest(volume)?.files.into_keys().collect())
}

/// Archive engine writing a single JSON volume
#[derive(Default)]
pub struct ManifestEngine {
    /// Make every `test` call fail
    pub fail_test: bool,
    pub(crate) creates: AtomicUsize,
}

impl ManifestEngine {
    /// Number of `create` calls so far
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveEngine for ManifestEngine {
    async fn create(&self, source: &Path, archive: &Path, options: CreateOptions) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let top = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut files = BTreeMap::new();
        let mut archived = Vec::new();
        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_name().to_string_lossy().starts_with(&base) {
                continue;
            }
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(source)
                    .map_err(|e| Error::Io(std::io::Error::other(e)))?;
                files.insert(
                    format!("{}/{}", top, rel.to_string_lossy()),
                    fs::read(entry.path())?,
                );
                archived.push(entry.into_path());
            }
        }

        let volume = PathBuf::from(format!("{}.001", archive.display()));
        fs::write(&volume, serde_json::to_vec(&ArchiveManifest { files })?)?;

        if options.delete_source {
            for file in archived {
                fs::remove_file(file)?;
            }
        }
        Ok(())
    }

    async fn test(&self, archive: &Path) -> Result<()> {
        if self.fail_test {
            return Err(corrupt_archive());
        }
        read_manifest(archive).map(|_| ())
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        for (rel, bytes) in read_manifest(archive)?.files {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, bytes)?;
        }
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
        "manifest"
    }
}

/// Parity handler answering in the par2j dialect
#[derive(Default)]
pub struct ManifestParity {
    /// Report a failed repair instead of rewriting the files
    pub repair_fails: bool,
    /// Answer verification with output no marker recognises
    pub gibberish: bool,
    pub(crate) creates: AtomicUsize,
}

impl ManifestParity {
    /// Number of `create` calls so far
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParityHandler for ManifestParity {
    async fn create(&self, request: &CreateRequest) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut files = BTreeMap::new();
        for source in &request.sources {
            files.insert(source.clone(), fs::read(source)?);
        }
        fs::write(&request.output, serde_json::to_vec(&ParityManifest { files })?)?;
        Ok(())
    }

    async fn verify(&self, par2_file: &Path) -> Result<VerifyReport> {
        let manifest: ParityManifest = serde_json::from_slice(&fs::read(par2_file)?)?;
        let intact = manifest
            .files
            .iter()
            .all(|(path, bytes)| fs::read(path).map(|b| &b == bytes).unwrap_or(false));
        let stdout = match (self.gibberish, intact) {
            (true, _) => "Parchive client 9.9: unexpected banner",
            (false, true) => "All Files Complete",
            (false, false) => "Input File Slice found : 0\nReady to repair",
        };
        Ok(parse_verify_output(stdout, "", &MarkerSet::par2j()))
    }

    async fn repair(&self, par2_file: &Path) -> Result<RepairReport> {
        if self.repair_fails {
            return Ok(parse_repair_output(
                "Need more recovery slice : 4",
                "",
                ExitStatus::Failure,
                &MarkerSet::par2j(),
            ));
        }
        let manifest: ParityManifest = serde_json::from_slice(&fs::read(par2_file)?)?;
        for (path, bytes) in manifest.files {
            fs::write(path, bytes)?;
        }
        Ok(parse_repair_output(
            "Repaired successfully",
            "",
            ExitStatus::Success,
            &MarkerSet::par2j(),
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
        "manifest"
    }
}
