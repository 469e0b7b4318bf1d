//! Stress harness: many independent callers registering at once.
//!
//! Every worker opens its own connection and issues exactly one `Register`,
//! then prints the snapshot it got back. Workers are either forked
//! processes (distinct process ids) or OS threads of this process (one
//! process id, distinct thread ids).
//!
//! A failing worker never stops the harness; it is recorded as a
//! [`ChildFailure`] and the remaining workers are still awaited.

use std::io::Write;
use std::path::{Path, PathBuf};

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use thiserror::Error;
use tracing::{debug, info, warn};

use qctl_control::ControlClient;
use qctl_core::SnapshotRecord;

/// The harness itself could not run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fork failed after {launched} workers: {source}")]
    Fork {
        launched: usize,
        #[source]
        source: nix::Error,
    },

    #[error("failed to start worker thread after {launched} workers: {source}")]
    Thread {
        launched: usize,
        #[source]
        source: std::io::Error,
    },
}

/// One worker that did not finish cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChildFailure {
    #[error("worker {index} (pid {pid}) exited with status {code}")]
    Exited { index: usize, pid: i32, code: i32 },

    #[error("worker {index} (pid {pid}) killed by {signal}")]
    Signaled {
        index: usize,
        pid: i32,
        signal: String,
    },

    #[error("worker {index} could not be reaped: {message}")]
    Lost { index: usize, message: String },

    #[error("worker {index} failed: {message}")]
    Failed { index: usize, message: String },

    #[error("worker {index} panicked")]
    Panicked { index: usize },
}

/// Outcome of one harness run.
#[derive(Debug, Default)]
pub struct HarnessReport {
    /// Workers started.
    pub launched: usize,
    /// Workers that did not finish cleanly.
    pub failures: Vec<ChildFailure>,
    /// Snapshots received by worker threads. Forked workers print theirs and
    /// exit, so this stays empty for them.
    pub snapshots: Vec<SnapshotRecord>,
}

impl HarnessReport {
    pub fn succeeded(&self) -> usize {
        self.launched - self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, failure: ChildFailure) {
        warn!(%failure, "Worker failed");
        self.failures.push(failure);
    }
}

/// Connect, register once and return the snapshot.
///
/// Builds its own single-threaded runtime so it can run in a freshly forked
/// child or in a plain OS thread.
pub fn register_once(socket: &Path) -> qctl_core::Result<SnapshotRecord> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let mut client = ControlClient::connect(socket).await?;
        client.register().await
    })
}

fn print_snapshot(snapshot: &SnapshotRecord) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", snapshot);
    let _ = out.flush();
}

/// Body of a forked worker; returns its exit status.
fn run_child(socket: &Path) -> i32 {
    match register_once(socket) {
        Ok(snapshot) => {
            print_snapshot(&snapshot);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Fork `count` workers, then wait for all of them.
///
/// Must be called while this process is single-threaded: no tokio runtime
/// and no other threads may exist, since the children continue from the
/// fork point.
pub fn spawn_processes(socket: &Path, count: usize) -> Result<HarnessReport, HarnessError> {
    let _ = std::io::stdout().flush();

    let mut report = HarnessReport::default();
    let mut children: Vec<(usize, Pid)> = Vec::with_capacity(count);
    let mut fork_error = None;

    for index in 0..count {
        // SAFETY: the caller guarantees no other threads exist; the child
        // only builds its own runtime, talks to the socket, and exits.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => std::process::exit(run_child(socket)),
            Ok(ForkResult::Parent { child }) => {
                debug!(index, pid = child.as_raw(), "Worker forked");
                children.push((index, child));
            }
            Err(e) => {
                fork_error = Some(e);
                break;
            }
        }
    }

    report.launched = children.len();
    info!(launched = report.launched, "Waiting for worker processes");

    for (index, pid) in children {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, 0)) => {}
            Ok(WaitStatus::Exited(pid, code)) => report.record(ChildFailure::Exited {
                index,
                pid: pid.as_raw(),
                code,
            }),
            Ok(WaitStatus::Signaled(pid, signal, _)) => report.record(ChildFailure::Signaled {
                index,
                pid: pid.as_raw(),
                signal: signal.to_string(),
            }),
            Ok(other) => report.record(ChildFailure::Lost {
                index,
                message: format!("unexpected wait status {:?}", other),
            }),
            Err(e) => report.record(ChildFailure::Lost {
                index,
                message: e.to_string(),
            }),
        }
    }

    if let Some(source) = fork_error {
        return Err(HarnessError::Fork {
            launched: report.launched,
            source,
        });
    }

    Ok(report)
}

/// Start `count` worker threads, then join all of them.
pub fn spawn_threads(socket: &Path, count: usize) -> Result<HarnessReport, HarnessError> {
    let mut report = HarnessReport::default();
    let mut handles = Vec::with_capacity(count);
    let mut spawn_error = None;

    for index in 0..count {
        let socket: PathBuf = socket.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name(format!("qctl-worker-{}", index))
            .spawn(move || {
                let snapshot = register_once(&socket)?;
                print_snapshot(&snapshot);
                Ok::<_, qctl_core::Error>(snapshot)
            });
        match spawned {
            Ok(handle) => handles.push((index, handle)),
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        }
    }

    report.launched = handles.len();
    info!(launched = report.launched, "Waiting for worker threads");

    for (index, handle) in handles {
        match handle.join() {
            Ok(Ok(snapshot)) => report.snapshots.push(snapshot),
            Ok(Err(e)) => report.record(ChildFailure::Failed {
                index,
                message: e.to_string(),
            }),
            Err(_) => report.record(ChildFailure::Panicked { index }),
        }
    }

    if let Some(source) = spawn_error {
        return Err(HarnessError::Thread {
            launched: report.launched,
            source,
        });
    }

    Ok(report)
}
