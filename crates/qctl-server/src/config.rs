//! Endpoint configuration.

use std::path::PathBuf;

use qctl_control::default_socket_path;
use qctl_core::constants::{DEFAULT_QUANTUM, DEFAULT_SOCKET_MODE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Where the control socket is bound.
    pub socket_path: PathBuf,
    /// Permission bits of the socket file.
    pub socket_mode: u32,
    /// Quantum the store starts from.
    pub initial_quantum: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            socket_mode: DEFAULT_SOCKET_MODE,
            initial_quantum: DEFAULT_QUANTUM,
        }
    }
}
