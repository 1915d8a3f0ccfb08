//! PAR2 handler used when no parity binary can be located

use super::traits::{CreateRequest, ParityCapabilities, ParityHandler, RepairReport, VerifyReport};
use crate::config::Par2Dialect;
use async_trait::async_trait;
use std::path::Path;

/// PAR2 handler used when no external binary is available or configured
///
/// Every operation fails with `Error::ToolNotFound` naming the binary the
/// configured dialect expects, so the surrounding workflow aborts instead of
/// extracting or archiving without protection.
///
/// # Examples
///
/// ```
/// use parvault::config::Par2Dialect;
/// use parvault::parity::{ParityHandler, UnavailableParityHandler};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let handler = UnavailableParityHandler::new(Par2Dialect::Par2j);
/// let err = handler.verify(Path::new("/a/a.7z.par2")).await.unwrap_err();
/// assert!(err.is_fatal());
/// # }
/// ```
pub struct UnavailableParityHandler {
    tool: &'static str,
}

impl UnavailableParityHandler {
    /// Handler standing in for the binary of `dialect`
    pub fn new(dialect: Par2Dialect) -> Self {
        Self {
            tool: dialect.binary_names().first().copied().unwrap_or("par2"),
        }
    }

    fn missing(&self) -> crate::Error {
        crate::Error::tool_not_found(self.tool)
    }
}

#[async_trait]
impl ParityHandler for UnavailableParityHandler {
    async fn create(&self, _request: &CreateRequest) -> crate::Result<()> {
        Err(self.missing())
    }

    async fn verify(&self, _par2_file: &Path) -> crate::Result<VerifyReport> {
        Err(self.missing())
    }

    async fn repair(&self, _par2_file: &Path) -> crate::Result<RepairReport> {
        Err(self.missing())
    }

    fn capabilities(&self) -> ParityCapabilities {
        ParityCapabilities {
            can_create: false,
            can_verify: false,
            can_repair: false,
        }
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
