//! Protocol and configuration constants for qctl.

use std::ops::RangeInclusive;

// =============================================================================
// Parameter Store
// =============================================================================

/// Compile-time default for the shared quantum. `Reset` restores this value.
pub const DEFAULT_QUANTUM: i32 = 4000;

/// Range accepted client-side for quantum-setting and spawn-count arguments.
pub const CLIENT_ARG_RANGE: RangeInclusive<i64> = 1..=10;

// =============================================================================
// Command Codes
// =============================================================================

/// Family tag shared by every qctl command code.
pub const COMMAND_MAGIC: u8 = b'k';

/// Highest command number in the family.
pub const MAX_COMMAND_NR: u8 = 7;

/// Size of the integer payload carried by pointer verbs.
pub const INT_PAYLOAD_LEN: usize = 4;

/// Size of an encoded [`SnapshotRecord`](crate::snapshot::SnapshotRecord).
pub const SNAPSHOT_LEN: usize = 60;

// =============================================================================
// Wire Format
// =============================================================================

/// Length of the frame header (4 bytes, little-endian u32).
pub const FRAME_HEADER_LEN: usize = 4;

/// Maximum frame payload size (64 KiB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Errno values carried in negative result codes
// =============================================================================

/// "Inappropriate ioctl for device": unknown command.
pub const ENOTTY: i64 = 25;

/// Bad address: caller memory inaccessible.
pub const EFAULT: i64 = 14;

/// Out of memory: ledger entry allocation failed.
pub const ENOMEM: i64 = 12;

// =============================================================================
// Socket Paths
// =============================================================================

/// Directory under `$XDG_RUNTIME_DIR` holding the control socket.
pub const SOCKET_DIR_NAME: &str = "qctl";

/// File name of the control socket.
pub const SOCKET_FILE_NAME: &str = "control.sock";

/// Default permissions for the control socket file.
///
/// World-accessible: the endpoint serves unprivileged callers.
pub const DEFAULT_SOCKET_MODE: u32 = 0o666;
