//! PAR2 recovery-data handling
//!
//! The core abstraction is the [`ParityHandler`] trait, which covers
//! generation, verification and repair. Implementations:
//!
//! - [`CliParityHandler`]: drives an external binary in one of the supported
//!   [`Par2Dialect`](crate::config::Par2Dialect)s
//! - [`UnavailableParityHandler`]: stands in when no binary can be found and
//!   fails every call with `ToolNotFound`
//!
//! Tool reports are free text. [`MarkerSet`] holds the substrings each dialect
//! prints per outcome; nothing outside this module inspects tool output.
//!
//! ## Usage
//!
//! ```no_run
//! use parvault::config::Par2Dialect;
//! use parvault::integrity::VerificationOutcome;
//! use parvault::parity::{CliParityHandler, ParityHandler};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = CliParityHandler::from_path(Par2Dialect::Par2j)
//!         .expect("par2j64 binary not found");
//!
//!     let par2 = Path::new("/photos/2005/2005.7z.001.par2");
//!     let report = handler.verify(par2).await?;
//!     if report.outcome == VerificationOutcome::RepairableDamage {
//!         let repair = handler.repair(par2).await?;
//!         println!("repaired: {}", repair.success());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod parser;
mod traits;
mod unavailable;

pub use cli::CliParityHandler;
pub use parser::{ExitStatus, MarkerSet, parse_repair_output, parse_verify_output};
pub use traits::{CreateRequest, ParityCapabilities, ParityHandler, RepairReport, VerifyReport};
pub use unavailable::UnavailableParityHandler;
