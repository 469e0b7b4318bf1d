//! qctl-core: Shared library for the qctl control endpoint.
//!
//! This crate provides:
//! - Command codes for the fixed verb family
//! - Request/response messages and the length-prefixed wire codec
//! - The snapshot record returned by `Register`
//! - Error types and logging setup shared by server and client

pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod snapshot;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
pub use snapshot::SnapshotRecord;
