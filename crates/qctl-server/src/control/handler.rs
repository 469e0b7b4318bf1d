//! Server control socket handler.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use qctl_control::{bind_control_socket, ControlSocketGuard, SocketResult};
use qctl_core::protocol::{Codec, Request};

use crate::context::CallerContext;
use crate::gateway::Gateway;

/// Listens on the control socket and serves callers until shut down.
pub struct ControlServer {
    /// Unix socket listener.
    listener: UnixListener,
    /// Socket guard (removes socket on drop).
    guard: ControlSocketGuard,
    gateway: Arc<Gateway>,
}

impl ControlServer {
    /// Bind the control socket at `path`.
    ///
    /// Fails if another endpoint is already listening there.
    pub fn bind(path: &Path, mode: u32, gateway: Arc<Gateway>) -> SocketResult<Self> {
        let (guard, listener) = bind_control_socket(path, mode)?;
        Ok(Self {
            listener,
            guard,
            gateway,
        })
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    /// Serve callers until `shutdown` completes.
    ///
    /// On shutdown the listener stops accepting, every connection task is
    /// aborted and awaited, and the socket file is removed. The gateway is
    /// handed back so the caller can tear it down.
    pub async fn run_until<F>(self, shutdown: F) -> Arc<Gateway>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            guard,
            gateway,
        } = self;
        tokio::pin!(shutdown);

        info!(path = %guard.path().display(), "Control server running");
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(connections = tasks.len(), "Control server shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let gateway = Arc::clone(&gateway);
                        tasks.spawn(async move {
                            if let Err(e) = handle_client(stream, gateway).await {
                                warn!(error = %e, "Control client error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Control socket accept error");
                        // Brief backoff on accept errors
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "Control client task panicked");
                        }
                    }
                }
            }
        }

        drop(listener);
        tasks.shutdown().await;
        drop(guard);

        gateway
    }
}

/// Serve one caller connection until it closes.
async fn handle_client(mut stream: UnixStream, gateway: Arc<Gateway>) -> qctl_core::Result<()> {
    let peer_pid = stream.peer_cred().ok().and_then(|cred| cred.pid());
    debug!(peer_pid, "Control client opened");

    let mut buf = BytesMut::with_capacity(1024);

    loop {
        while let Some(request) = Codec::decode::<Request>(&mut buf)? {
            let ctx = CallerContext::resolve(peer_pid, request.thread_id);
            let response = gateway.handle(&ctx, request);
            let frame = Codec::encode(&response)?;
            stream.write_all(&frame).await?;
        }

        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            debug!(peer_pid, "Control client closed");
            return Ok(());
        }
    }
}
