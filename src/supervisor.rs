//! Backend process supervision.
//!
//! A [`Supervisor`] owns at most one backend process at a time. `start`
//! verifies the graph and launches the process; a monitor task then owns
//! the [`Child`] and is the only place the process is waited on or
//! killed. When the process exits on its own, the monitor records the
//! exit and publishes [`LifecycleEvent::BackendExited`] for the lifecycle
//! task to act on. Nothing here restarts the backend or ends the program.
//!
//! Termination is a request: on Unix the backend receives SIGTERM and
//! gets [`DEFAULT_TERMINATE_GRACE`] to exit before it is killed.
//!
//! State lives behind a mutex so the health endpoint can read a
//! consistent [`ProcessStatus`] snapshot while the monitor updates it.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::GatewayError;
use crate::graph::{self, GraphLocation};
use crate::lifecycle::LifecycleEvent;

/// How long a backend may take to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(10);

/// Program and arguments used to launch the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl From<ExitInfo> for GatewayError {
    fn from(info: ExitInfo) -> Self {
        Self::BackendExited {
            code: info.code,
            signal: info.signal,
        }
    }
}

/// Point-in-time view of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub exit: Option<ExitInfo>,
}

impl ProcessStatus {
    /// Spawned and not yet exited. Says nothing about whether the
    /// backend accepts connections yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }
}

/// Sent to the monitor to request termination; the monitor replies once
/// the kill has been issued.
type TerminateRequest = oneshot::Sender<()>;

#[derive(Debug)]
struct Inner {
    state: ProcessState,
    /// Bumped for every launch and every stop so a monitor can tell
    /// whether the process it watches is still the current one.
    generation: u64,
    pid: Option<u32>,
    last_exit: Option<ExitInfo>,
    terminate: Option<oneshot::Sender<TerminateRequest>>,
}

pub struct Supervisor {
    command: BackendCommand,
    graph: GraphLocation,
    terminate_grace: Duration,
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
}

impl Supervisor {
    #[must_use]
    pub fn new(
        command: BackendCommand,
        graph: GraphLocation,
        events: mpsc::UnboundedSender<LifecycleEvent>,
    ) -> Self {
        Self {
            command,
            graph,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
            inner: Arc::new(Mutex::new(Inner {
                state: ProcessState::NotStarted,
                generation: 0,
                pid: None,
                last_exit: None,
                terminate: None,
            })),
            events,
        }
    }

    #[must_use]
    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// Launch the backend unless one is already starting or running.
    ///
    /// Fails without spawning when no graph artifact exists, and fails
    /// when the program cannot be executed.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().await;
        if matches!(inner.state, ProcessState::Starting | ProcessState::Running) {
            tracing::debug!(pid = ?inner.pid, "backend already started");
            return Ok(());
        }

        graph::check_availability(&self.graph).await?;

        inner.state = ProcessState::Starting;
        tracing::info!(
            program = %self.command.program.display(),
            args = ?self.command.args,
            graph = %self.graph.primary().display(),
            "launching backend"
        );

        let child = match Command::new(&self.command.program)
            .args(&self.command.args)
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                inner.state = ProcessState::NotStarted;
                return Err(GatewayError::Spawn {
                    program: self.command.program.display().to_string(),
                    source,
                });
            }
        };

        let (terminate_tx, terminate_rx) = oneshot::channel();
        inner.generation += 1;
        inner.state = ProcessState::Running;
        inner.pid = child.id();
        inner.last_exit = None;
        inner.terminate = Some(terminate_tx);

        tracing::info!(pid = ?inner.pid, "backend running");

        tokio::spawn(monitor(
            child,
            inner.generation,
            self.terminate_grace,
            terminate_rx,
            Arc::clone(&self.inner),
            self.events.clone(),
        ));
        Ok(())
    }

    /// Ask the running backend to terminate and forget about it.
    ///
    /// Returns once the termination request has been sent, without
    /// waiting for the process to exit. A no-op when nothing is running.
    pub async fn stop(&self) {
        let terminate = {
            let mut inner = self.inner.lock().await;
            let Some(terminate) = inner.terminate.take() else {
                tracing::debug!("stop requested, no backend running");
                return;
            };
            inner.generation += 1;
            inner.state = ProcessState::NotStarted;
            inner.pid = None;
            terminate
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if terminate.send(ack_tx).is_ok() {
            // Err means the monitor finished first: the process is gone anyway.
            let _ = ack_rx.await;
        }
        tracing::info!("backend termination requested");
    }

    pub async fn status(&self) -> ProcessStatus {
        let inner = self.inner.lock().await;
        ProcessStatus {
            state: inner.state,
            pid: inner.pid,
            exit: inner.last_exit,
        }
    }
}

enum Wake {
    Exited(std::io::Result<ExitStatus>),
    Terminate(Option<TerminateRequest>),
}

/// SIGTERM on Unix, a hard kill elsewhere or when the signal cannot be sent.
fn request_termination(child: &mut Child) {
    let Some(id) = child.id() else {
        return;
    };

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match i32::try_from(id) {
            Ok(pid) => match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                Ok(()) => {
                    tracing::debug!(pid, "sent SIGTERM to backend");
                    return;
                }
                Err(e) => tracing::warn!(pid, error = %e, "failed to send SIGTERM, killing backend"),
            },
            Err(_) => tracing::warn!(id, "backend pid out of range, killing backend"),
        }
    }

    if let Err(e) = child.start_kill() {
        tracing::warn!(pid = id, error = %e, "failed to kill backend");
    }
}

async fn monitor(
    mut child: Child,
    generation: u64,
    grace: Duration,
    mut terminate: oneshot::Receiver<TerminateRequest>,
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<LifecycleEvent>,
) {
    let wake = tokio::select! {
        status = child.wait() => Wake::Exited(status),
        request = &mut terminate => Wake::Terminate(request.ok()),
    };

    let status = match wake {
        Wake::Exited(status) => status,
        Wake::Terminate(ack) => {
            request_termination(&mut child);
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                tracing::debug!(status = ?status, "stopped backend exited");
                return;
            }
            tracing::warn!(
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "backend ignored termination request, killing it"
            );
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "failed to kill backend");
            }
            let status = child.wait().await;
            tracing::debug!(status = ?status, "stopped backend exited");
            return;
        }
    };

    let info = match status {
        Ok(status) => ExitInfo::from(status),
        Err(e) => {
            tracing::error!(error = %e, "failed to wait on backend");
            ExitInfo {
                code: None,
                signal: None,
            }
        }
    };

    {
        let mut guard = inner.lock().await;
        if guard.generation != generation {
            return;
        }
        guard.state = ProcessState::Exited;
        guard.pid = None;
        guard.last_exit = Some(info);
        guard.terminate = None;
    }

    tracing::error!(code = ?info.code, signal = ?info.signal, "backend exited");
    let _ = events.send(LifecycleEvent::BackendExited(info));
}
