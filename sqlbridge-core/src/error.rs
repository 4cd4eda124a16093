use sqlbridge_db::ResultCode;

use crate::memory::MemoryError;
use crate::protocol::ProtocolError;
use crate::provider::ApiMember;

/// Result type for value-returning bridge calls.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by the host provider.
///
/// Status-returning calls report failures as a [`ResultCode`] instead, the
/// way the native API does; this type covers the calls whose return value is
/// data.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The sandbox reply could not be decoded, or the sandbox faulted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The operation is declared but not available in this environment.
    #[error("{} is not supported in this environment", .0.symbol())]
    Unsupported(ApiMember),

    /// The engine returned a non-success status where data was expected.
    #[error("engine returned status {0}")]
    Engine(ResultCode),

    /// The side channel rejected an access.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl BridgeError {
    /// `true` for [`BridgeError::Unsupported`].
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
