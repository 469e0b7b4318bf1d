//! Unix socket plumbing for the control endpoint.
//!
//! Socket path strategy:
//! - `$XDG_RUNTIME_DIR/qctl/control.sock` when a runtime dir is available
//! - `/tmp/qctl-<uid>.sock` otherwise
//!
//! Either can be overridden with `--socket` / `QCTL_SOCKET`.

use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::UnixListener;

use qctl_core::constants::{SOCKET_DIR_NAME, SOCKET_FILE_NAME};

/// Errors that can occur during socket setup.
#[derive(Debug, Error)]
pub enum SocketError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Another endpoint is already listening at this socket.
    #[error("endpoint already running at {}", .0.display())]
    AlreadyRunning(PathBuf),
    /// Path exists but is not a socket.
    #[error("path exists but is not a socket: {}", .0.display())]
    NotASocket(PathBuf),
}

impl From<SocketError> for qctl_core::Error {
    fn from(e: SocketError) -> Self {
        match e {
            SocketError::Io(io_err) => qctl_core::Error::Io(io_err),
            other => qctl_core::Error::Protocol {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for socket operations.
pub type SocketResult<T> = std::result::Result<T, SocketError>;

/// Default control socket path.
///
/// Prefers `$XDG_RUNTIME_DIR/qctl/control.sock`; falls back to
/// `/tmp/qctl-<uid>.sock`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
        if !xdg_runtime.is_empty() {
            return PathBuf::from(xdg_runtime)
                .join(SOCKET_DIR_NAME)
                .join(SOCKET_FILE_NAME);
        }
    }

    let uid = nix::unistd::geteuid();
    PathBuf::from(format!("/tmp/qctl-{}.sock", uid))
}

/// Ensure the parent directory exists.
///
/// For `XDG_RUNTIME_DIR` paths the directory is created with mode 0755 so
/// that other local users can reach the socket.
fn ensure_socket_directory(path: &Path) -> SocketResult<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(parent)?;

        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            if !xdg_runtime.is_empty() && parent.starts_with(&xdg_runtime) {
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755))?;
            }
        }
    }
    Ok(())
}

/// Check if a socket is stale (no endpoint listening) and remove it.
///
/// Returns:
/// - `Ok(true)` if nothing is at the path, or a stale socket was removed
/// - `Ok(false)` if an endpoint is already running
/// - `Err` if the path exists but is not a socket
fn check_and_cleanup_stale_socket(path: &Path) -> SocketResult<bool> {
    if !path.exists() {
        return Ok(true);
    }

    let metadata = std::fs::metadata(path)?;
    if !metadata.file_type().is_socket() {
        return Err(SocketError::NotASocket(path.to_path_buf()));
    }

    match StdUnixStream::connect(path) {
        Ok(_) => Ok(false),
        Err(e)
            if e.kind() == std::io::ErrorKind::ConnectionRefused
                || e.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::debug!(path = %path.display(), "Removing stale socket");
            std::fs::remove_file(path)?;
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Bind the control socket with single-instance enforcement.
///
/// 1. Ensures the parent directory exists
/// 2. Refuses to start if another endpoint is listening
/// 3. Removes a stale socket
/// 4. Binds and applies `mode` to the socket file
///
/// Must be called from within a tokio runtime.
pub fn bind_control_socket(
    path: &Path,
    mode: u32,
) -> SocketResult<(ControlSocketGuard, UnixListener)> {
    ensure_socket_directory(path)?;

    if !check_and_cleanup_stale_socket(path)? {
        return Err(SocketError::AlreadyRunning(path.to_path_buf()));
    }

    let listener = UnixListener::bind(path)?;
    let guard = ControlSocketGuard {
        path: path.to_path_buf(),
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;

    tracing::info!(path = %path.display(), mode = %format!("{:o}", mode), "Control socket bound");

    Ok((guard, listener))
}

/// RAII guard that removes the socket path on drop.
#[derive(Debug)]
pub struct ControlSocketGuard {
    path: PathBuf,
}

impl ControlSocketGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ControlSocketGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_xdg() {
        // Only test in this crate that touches XDG_RUNTIME_DIR
        std::env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        let path = default_socket_path();
        assert_eq!(path, PathBuf::from("/run/user/1000/qctl/control.sock"));
        std::env::remove_var("XDG_RUNTIME_DIR");
        let uid = nix::unistd::geteuid();
        assert_eq!(
            default_socket_path(),
            PathBuf::from(format!("/tmp/qctl-{}.sock", uid))
        );
    }

    #[tokio::test]
    async fn test_socket_creation_applies_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("control.sock");

        let (_guard, _listener) = bind_control_socket(&path, 0o600).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.file_type().is_socket());
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_socket_cleanup_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("control.sock");

        {
            let (_guard, _listener) = bind_control_socket(&path, 0o600).unwrap();
            assert!(path.exists());
        }

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_second_bind_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("control.sock");

        let (_guard, _listener) = bind_control_socket(&path, 0o600).unwrap();
        let err = bind_control_socket(&path, 0o600).unwrap_err();
        assert!(matches!(err, SocketError::AlreadyRunning(_)));
    }

    #[tokio::test]
    async fn test_stale_socket_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stale.sock");

        {
            let (guard, _listener) = bind_control_socket(&path, 0o600).unwrap();
            // Simulate a crashed endpoint: keep the file, drop the listener
            std::mem::forget(guard);
        }
        assert!(path.exists());

        assert!(check_and_cleanup_stale_socket(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_regular_file_is_not_a_socket() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plain");
        std::fs::write(&path, b"x").unwrap();

        let err = check_and_cleanup_stale_socket(&path).unwrap_err();
        assert!(matches!(err, SocketError::NotASocket(_)));
    }
}
