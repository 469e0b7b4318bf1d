//! Endpoint lifecycle: start the gateway, serve, drain the ledger.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::control::ControlServer;
use crate::error::{ServerError, ServerResult};
use crate::gateway::Gateway;
use crate::ledger::{DrainReport, Ledger};
use crate::store::ParameterStore;

/// Run the endpoint described by `config` until `shutdown` completes.
///
/// The ledger starts empty and is drained once every connection is gone.
pub async fn run_endpoint<F>(config: &ServerConfig, shutdown: F) -> ServerResult<DrainReport>
where
    F: Future<Output = ()>,
{
    let gateway = Arc::new(Gateway::new(
        ParameterStore::new(config.initial_quantum),
        Ledger::new(),
    ));
    let server = ControlServer::bind(&config.socket_path, config.socket_mode, gateway)?;
    info!(
        path = %server.path().display(),
        quantum = config.initial_quantum,
        "Endpoint started"
    );

    let gateway = server.run_until(shutdown).await;
    let gateway = Arc::try_unwrap(gateway).map_err(|shared| ServerError::LedgerStillShared {
        holders: Arc::strong_count(&shared),
    })?;

    let report = gateway.into_ledger().drain();
    info!(released = report.released, "Endpoint stopped");
    Ok(report)
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "Cannot watch SIGTERM, waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = term.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qctl_control::ControlClient;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn drains_every_distinct_caller() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            socket_path: tmp.path().join("control.sock"),
            socket_mode: 0o600,
            initial_quantum: 11,
        };

        let (tx, rx) = oneshot::channel::<()>();
        let path = config.socket_path.clone();
        let endpoint = tokio::spawn(async move {
            run_endpoint(&config, async {
                let _ = rx.await;
            })
            .await
        });

        // Wait for the socket to appear
        let mut client = loop {
            match ControlClient::connect(&path).await {
                Ok(client) => break client,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };
        assert_eq!(client.query().await.unwrap(), 11);
        client.register().await.unwrap();
        client.register().await.unwrap();
        drop(client);

        tx.send(()).unwrap();
        let report = endpoint.await.unwrap().unwrap();
        assert_eq!(report.released, 1);
    }

    #[tokio::test]
    async fn second_endpoint_on_same_socket_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            socket_path: tmp.path().join("control.sock"),
            socket_mode: 0o600,
            initial_quantum: 0,
        };

        let first = ControlServer::bind(
            &config.socket_path,
            config.socket_mode,
            Arc::new(Gateway::new(ParameterStore::default(), Ledger::new())),
        )
        .unwrap();

        let result = run_endpoint(&config, async {}).await;
        assert!(matches!(
            result,
            Err(ServerError::Socket(qctl_control::SocketError::AlreadyRunning(_)))
        ));
        drop(first);
    }
}
