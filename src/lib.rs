//! # parvault
//!
//! Long-term protection for folders of media files: seal each folder into a
//! 7z archive, add PAR2 recovery data, verify and repair later, and find
//! byte-identical duplicates.
//!
//! ## Design Philosophy
//!
//! parvault is designed to be:
//! - **Idempotent** - re-running a workflow resumes where the last run stopped
//! - **Tool-driven** - 7-Zip and a PAR2 client do the heavy lifting
//! - **Event-driven** - consumers subscribe to events, no polling required
//! - **Testable** - external tools sit behind traits so fakes can stand in
//!
//! ## Quick Start
//!
//! ```no_run
//! use parvault::{Config, Orchestrator};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::from_config(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = orchestrator.protect_tree(Path::new("/media/photos")).await?;
//!     println!("{} folders protected", report.completed.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// 7-Zip archive creation, testing and extraction
pub mod archive;
/// Configuration types
pub mod config;
/// Duplicate file detection and quarantine
pub mod duplicates;
/// Error types
pub mod error;
/// Content hashing
pub mod fingerprint;
/// Verification and repair against recovery data
pub mod integrity;
/// Top-level workflows
pub mod orchestrator;
/// PAR2 parity handling
pub mod parity;
/// Recovery-data sizing and generation
pub mod recovery;
/// Size aggregation over path sets
pub mod size;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use archive::{ArchiveCapabilities, ArchiveEngine, CliArchiveEngine, UnavailableArchiveEngine};
pub use config::{
    ArchiveConfig, Config, DuplicateConfig, FileCollisionAction, Par2Dialect, RecoveryConfig,
    RestoreConfig, ToolsConfig,
};
pub use duplicates::{DuplicateDetector, DuplicateGroup, QuarantineReport};
pub use error::{Error, Result};
pub use fingerprint::{ContentHash, Fingerprinter};
pub use integrity::{IntegrityCheck, IntegrityVerifier, VerificationOutcome};
pub use orchestrator::{
    DedupeReport, Orchestrator, ProtectReport, RecoveryState, RestoreReport, Tools, TreeReport,
    UnitFailure,
};
pub use parity::{
    CliParityHandler, ParityCapabilities, ParityHandler, RepairReport, UnavailableParityHandler,
    VerifyReport,
};
pub use recovery::{RecoveryPlan, RecoveryPlanner};
pub use size::{PathSet, SizeAggregator};
pub use types::{ArchiveJob, ArchiveStatus, Event, Stage};

/// Run `work` until it finishes or a termination signal arrives
///
/// Returns `None` when interrupted. The interrupted future is dropped; a
/// leftover staging archive is removed by the next protect run.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use parvault::{Config, Orchestrator, run_until_signal};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let orchestrator = Orchestrator::from_config(Config::default())?;
///     match run_until_signal(orchestrator.restore_tree(Path::new("/media"))).await {
///         Some(report) => println!("{} restored", report?.completed.len()),
///         None => println!("interrupted"),
///     }
///     Ok(())
/// }
/// ```
pub async fn run_until_signal<F>(work: F) -> Option<F::Output>
where
    F: std::future::Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = wait_for_signal() => None,
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
