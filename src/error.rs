//! Error types for parvault
//!
//! This module provides the error taxonomy shared by every workflow:
//! - Filesystem errors (missing paths, invalid paths, collisions)
//! - External tool errors (binary missing, non-zero exit)
//! - Integrity errors (unparseable reports, failed repairs)
//! - Machine-readable error codes for reports and the command-line front end
//!
//! Propagation policy: [`Error::NotFound`] and [`Error::OutputAlreadyExists`] are
//! recovered locally by callers, [`Error::ToolNotFound`] aborts the current
//! top-level workflow, and everything else is reported per unit of work.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for parvault
///
/// Each variant carries the path or tool involved so every failure can be
/// reported with the specific path and reason.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "redundancy_percent")
        key: Option<String>,
    },

    /// A path did not exist when the operation needed it
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// External binary is absent from the configured path and PATH
    #[error("external tool not found: {tool}")]
    ToolNotFound {
        /// Tool that could not be located (e.g., "7z", "par2j64")
        tool: String,
    },

    /// External tool ran but exited with a failure status
    #[error("{tool} failed (exit code {code:?}): {output}")]
    ToolExecutionFailed {
        /// Tool that failed
        tool: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Trimmed combined output of the tool
        output: String,
    },

    /// Output file already exists (idempotency guard, not a real failure)
    #[error("output already exists: {}", .0.display())]
    OutputAlreadyExists(PathBuf),

    /// Verification report matched none of the known markers
    #[error("unrecognised verification report for {}: {output}", path.display())]
    Unparseable {
        /// Control file that was verified
        path: PathBuf,
        /// Verbatim tool output
        output: String,
    },

    /// Recovery tool reported that the data could not be reconstructed
    #[error("repair failed for {}: {reason}", path.display())]
    RepairFailed {
        /// Control file used for the repair
        path: PathBuf,
        /// Reason reported by the tool (or its verbatim output)
        reason: String,
    },

    /// Invalid path encountered (relative where absolute is required, no file name, ...)
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath {
        /// The invalid path
        path: PathBuf,
        /// Why the path was rejected
        reason: String,
    },

    /// Verification state machine was driven through an illegal transition
    #[error("invalid integrity transition from {from} to {to}")]
    InvalidTransition {
        /// State the machine was in
        from: String,
        /// State that was requested
        to: String,
    },

    /// Insufficient disk space for the recovery data
    #[error("insufficient disk space: need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Number of bytes required for the operation
        required: u64,
        /// Number of bytes currently available on disk
        available: u64,
    },

    /// File collision at destination
    #[error("file collision at {}: {reason}", path.display())]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
        /// The reason for the collision (e.g., "file already exists")
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::NotFound`] for any path-like value
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound(path.into())
    }

    /// Build a [`Error::ToolNotFound`] for the named tool
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Error::ToolNotFound { tool: tool.into() }
    }

    /// Whether this error must abort the whole top-level workflow
    ///
    /// Only a missing external binary qualifies: no further unit can make
    /// progress without it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ToolNotFound { .. })
    }

    /// Whether this error is the idempotency guard, which callers treat as success
    pub fn is_idempotent_skip(&self) -> bool {
        matches!(self, Error::OutputAlreadyExists(_))
    }

    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::ToolNotFound { .. } => "tool_not_found",
            Error::ToolExecutionFailed { .. } => "tool_execution_failed",
            Error::OutputAlreadyExists(_) => "output_already_exists",
            Error::Unparseable { .. } => "unparseable",
            Error::RepairFailed { .. } => "repair_failed",
            Error::InvalidPath { .. } => "invalid_path",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::InsufficientSpace { .. } => "insufficient_space",
            Error::FileCollision { .. } => "file_collision",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Map an I/O error on `path` to the crate taxonomy
///
/// `NotFound` becomes [`Error::NotFound`] carrying the path; everything else is
/// kept as [`Error::Io`].
pub(crate) fn io_at(path: impl Into<PathBuf>, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.into())
    } else {
        Error::Io(err)
    }
}
