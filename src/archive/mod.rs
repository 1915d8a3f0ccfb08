//! Sealed-archive handling through an external compression engine
//!
//! The core abstraction is the [`ArchiveEngine`] trait. Implementations:
//!
//! - [`CliArchiveEngine`]: drives an external `7z` binary
//! - [`UnavailableArchiveEngine`]: stands in when no binary can be found and
//!   fails every call with `ToolNotFound`
//!
//! The [`volumes`] helpers know how archives and their volumes are named on
//! disk, so workflows can find, promote and pair them with recovery files.

mod cli;
mod traits;
mod unavailable;
pub mod volumes;

pub use cli::CliArchiveEngine;
pub use traits::{ArchiveCapabilities, ArchiveEngine, CreateOptions};
pub use unavailable::UnavailableArchiveEngine;
pub use volumes::{
    archive_path_for, find_archives, find_volumes, is_archive_entry_point, recovery_candidates,
    strip_archive_extension,
};
