//! Control socket plumbing for qctl.
//!
//! This crate provides the Unix socket layer shared by the endpoint and its
//! callers:
//!
//! - **Socket**: path resolution, single-instance binding, stale-socket
//!   cleanup and an RAII guard removing the socket file. See [`socket`].
//! - **Client**: async client issuing verbs to a running endpoint. See
//!   [`client`].
//!
//! # Wire Format
//!
//! Frames are a 4-byte little-endian length followed by a bincode-encoded
//! `Request` (caller -> endpoint) or `Response` (endpoint -> caller). One
//! response answers each request, in order.

pub mod client;
pub mod socket;

pub use client::ControlClient;
pub use socket::{
    bind_control_socket, default_socket_path, ControlSocketGuard, SocketError, SocketResult,
};
