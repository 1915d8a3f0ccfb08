//! Content fingerprinting (SHA-256 over fixed-size chunks)

use crate::error::{Result, io_at};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Chunk size used when streaming file content through the hasher
pub const CHUNK_SIZE: usize = 4096;

/// SHA-256 digest of a file's content
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Lowercase hex rendering of the digest
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

/// Stateless service hashing file content
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter;

impl Fingerprinter {
    /// Hash `path` by streaming it in [`CHUNK_SIZE`] chunks
    ///
    /// A missing file yields `Error::NotFound`; callers treat that as
    /// "skip, do not match".
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let mut file = File::open(path).map_err(|e| io_at(path, e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).map_err(|e| io_at(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(ContentHash(hasher.finalize().into()))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let hash = Fingerprinter.hash_file(&path).unwrap();
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_multi_chunk_file_matches_one_shot_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let expected: [u8; 32] = Sha256::digest(&content).into();
        assert_eq!(Fingerprinter.hash_file(&path).unwrap(), ContentHash(expected));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = Fingerprinter.hash_file(Path::new("/nonexistent/file.jpg"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_different_content_different_hash() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"same length 1").unwrap();
        std::fs::write(&b, b"same length 2").unwrap();
        assert_ne!(
            Fingerprinter.hash_file(&a).unwrap(),
            Fingerprinter.hash_file(&b).unwrap()
        );
    }
}
