//! Error types for qctl-core.

use thiserror::Error;

use crate::constants::{EFAULT, ENOMEM, ENOTTY};

/// Main error type for qctl operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec error during encoding/decoding.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Protocol violation or malformed message.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The endpoint answered with a negative result code.
    #[error("command failed: {}", errno_name(*errno))]
    Command { errno: i64 },
}

impl Error {
    /// Build a [`Error::Command`] from a negative result code.
    pub fn from_result_code(code: i64) -> Self {
        Error::Command { errno: -code }
    }
}

fn errno_name(errno: i64) -> String {
    match errno {
        ENOTTY => "inappropriate control operation (ENOTTY)".to_string(),
        EFAULT => "bad address (EFAULT)".to_string(),
        ENOMEM => "out of memory (ENOMEM)".to_string(),
        other => format!("errno {}", other),
    }
}

/// Convenience result type for qctl operations.
pub type Result<T> = std::result::Result<T, Error>;
