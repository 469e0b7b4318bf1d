//! qctl-server: the control endpoint.
//!
//! Provides:
//! - Parameter store holding the shared quantum
//! - Registration ledger of callers
//! - Control gateway validating and dispatching command codes
//! - Unix socket front end and endpoint lifecycle

pub mod cli;
pub mod config;
pub mod context;
pub mod control;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod memory;
pub mod store;

pub use cli::Cli;
pub use config::ServerConfig;
pub use context::CallerContext;
pub use endpoint::{run_endpoint, shutdown_signal};
pub use error::{GatewayError, ServerError, ServerResult};
pub use gateway::Gateway;
pub use ledger::{DrainReport, Ledger, LedgerEntry};
pub use store::ParameterStore;
