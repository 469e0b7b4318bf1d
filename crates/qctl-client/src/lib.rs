//! qctl-client: command-line caller of the qctl endpoint.
//!
//! Provides:
//! - CLI parsing of the one-letter verbs
//! - Execution of a single verb over one connection
//! - The multi-process / multi-thread registration stress harness

pub mod cli;
pub mod harness;
pub mod ops;

pub use cli::{usage, Action, Call, Cli, UsageError};
pub use harness::{spawn_processes, spawn_threads, ChildFailure, HarnessError, HarnessReport};
pub use ops::{perform, run_call};
