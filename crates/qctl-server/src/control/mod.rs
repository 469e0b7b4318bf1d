//! Control socket interface for qctl-server.
//!
//! Accepts callers on a Unix socket and feeds each decoded request through
//! the [`Gateway`](crate::gateway::Gateway). Every connection is served by
//! its own task; requests on one connection are answered in order.

mod handler;

pub use handler::ControlServer;
