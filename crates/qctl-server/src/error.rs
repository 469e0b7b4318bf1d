//! Error types for qctl-server.

use thiserror::Error;

use qctl_control::SocketError;
use qctl_core::constants::{EFAULT, ENOMEM, ENOTTY};
use qctl_core::protocol::CommandCode;

/// Errors returned synchronously to the caller of a single command.
///
/// None of these is retried by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Unknown family, number out of range, or no verb with this exact code.
    #[error("unsupported command {code}")]
    UnsupportedCommand { code: CommandCode },

    /// Caller memory missing, too short, or not accessible in the needed
    /// direction.
    #[error("bad address")]
    BadAddress,

    /// Ledger entry allocation failed. The ledger itself is unaffected.
    #[error("ledger entry allocation failed")]
    AllocationFailure,
}

impl GatewayError {
    /// Errno carried (negated) in the response's result code.
    pub fn errno(&self) -> i64 {
        match self {
            GatewayError::UnsupportedCommand { .. } => ENOTTY,
            GatewayError::BadAddress => EFAULT,
            GatewayError::AllocationFailure => ENOMEM,
        }
    }

    /// The result code sent back to the caller.
    pub fn result_code(&self) -> i64 {
        -self.errno()
    }
}

/// Errors that stop the endpoint itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ledger is still referenced when it should be drained.
    #[error("ledger still shared at shutdown ({holders} holders)")]
    LedgerStillShared { holders: usize },
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;
