//! Process-wide lifecycle decisions.
//!
//! Backend exits and OS termination signals arrive as [`LifecycleEvent`]s
//! on one channel. [`run`] is the only place that decides whether the
//! gateway keeps serving, relaunches the backend, or ends: shutdown
//! signals stop the backend and return `Ok`, an unexpected backend exit
//! returns [`GatewayError::BackendExited`] once the restart budget is
//! spent. Shutdown is immediate; in-flight requests are not drained.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::supervisor::{ExitInfo, Supervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    BackendExited(ExitInfo),
    Shutdown(ShutdownReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// How many times a crashed backend is relaunched before the gateway
/// gives up. Zero means fail fast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: u32,
}

pub async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => ShutdownReason::Interrupt,
        () = terminate => ShutdownReason::Terminate,
    }
}

/// Forward the first termination signal onto the lifecycle channel.
pub fn spawn_signal_listener(events: mpsc::UnboundedSender<LifecycleEvent>) {
    tokio::spawn(async move {
        let reason = shutdown_signal().await;
        tracing::info!(signal = %reason, "received shutdown signal");
        let _ = events.send(LifecycleEvent::Shutdown(reason));
    });
}

/// Drive the gateway until a shutdown signal, a fatal backend exit, or
/// the server future ending on its own.
pub async fn run<F>(
    supervisor: Arc<Supervisor>,
    mut events: mpsc::UnboundedReceiver<LifecycleEvent>,
    server: F,
    policy: RestartPolicy,
) -> Result<(), GatewayError>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(server);
    let mut restarts = 0u32;

    loop {
        tokio::select! {
            result = &mut server => {
                tracing::warn!("http server stopped, stopping backend");
                supervisor.stop().await;
                return result.map_err(GatewayError::Io);
            }
            event = events.recv() => match event {
                Some(LifecycleEvent::Shutdown(reason)) => {
                    tracing::info!(signal = %reason, "shutting down");
                    supervisor.stop().await;
                    return Ok(());
                }
                Some(LifecycleEvent::BackendExited(info)) => {
                    if restarts >= policy.max_restarts {
                        tracing::error!(
                            code = ?info.code,
                            signal = ?info.signal,
                            restarts,
                            "backend exited, shutting down gateway"
                        );
                        return Err(info.into());
                    }
                    restarts += 1;
                    tracing::warn!(
                        code = ?info.code,
                        signal = ?info.signal,
                        attempt = restarts,
                        max = policy.max_restarts,
                        "backend exited, relaunching"
                    );
                    supervisor.start().await?;
                }
                None => {
                    supervisor.stop().await;
                    return Ok(());
                }
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::graph::GraphLocation;
    use crate::supervisor::{BackendCommand, ProcessState};

    fn setup(
        script: &str,
    ) -> (
        tempfile::TempDir,
        Arc<Supervisor>,
        mpsc::UnboundedSender<LifecycleEvent>,
        mpsc::UnboundedReceiver<LifecycleEvent>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test.osrm"), b"").unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let command = BackendCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
        };
        let sup = Arc::new(Supervisor::new(
            command,
            GraphLocation::new(dir.path(), "test"),
            tx.clone(),
        ));
        (dir, sup, tx, rx)
    }

    async fn wait_for(path: &std::path::Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        false
    }

    #[tokio::test]
    async fn shutdown_stops_backend_then_returns_ok() {
        let marks = tempfile::tempdir().unwrap();
        let ready = marks.path().join("ready");
        let term = marks.path().join("term");
        let script = format!(
            "trap 'touch {}; exit 0' TERM; touch {}; while true; do sleep 0.05; done",
            term.display(),
            ready.display()
        );
        let (_dir, sup, tx, rx) = setup(&script);
        sup.start().await.unwrap();
        assert!(sup.status().await.is_running());
        assert!(wait_for(&ready).await);

        tx.send(LifecycleEvent::Shutdown(ShutdownReason::Terminate))
            .unwrap();
        let result = run(
            Arc::clone(&sup),
            rx,
            std::future::pending(),
            RestartPolicy::default(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(sup.status().await.state, ProcessState::NotStarted);
        assert!(wait_for(&term).await, "backend did not receive SIGTERM");
    }

    #[tokio::test]
    async fn backend_crash_is_fatal_by_default() {
        let (_dir, sup, _tx, rx) = setup("exit 7");
        sup.start().await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run(Arc::clone(&sup), rx, std::future::pending(), RestartPolicy::default()),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::BackendExited {
                code: Some(7),
                signal: None
            }
        ));
        assert_eq!(err.exit_code(), 7);
    }

    #[tokio::test]
    async fn crash_is_relaunched_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("launches");
        let script = format!("echo x >> {}; exit 2", counter.display());
        let (_graph_dir, sup, _tx, rx) = setup(&script);
        sup.start().await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run(
                Arc::clone(&sup),
                rx,
                std::future::pending(),
                RestartPolicy { max_restarts: 2 },
            ),
        )
        .await
        .unwrap();

        assert_eq!(result.unwrap_err().exit_code(), 2);
        let launches = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(launches.lines().count(), 3);
    }

    #[tokio::test]
    async fn server_exit_stops_backend() {
        let (_dir, sup, _tx, rx) = setup("sleep 30");
        sup.start().await.unwrap();

        let result = run(Arc::clone(&sup), rx, async { Ok(()) }, RestartPolicy::default()).await;
        assert!(result.is_ok());
        assert_eq!(sup.status().await.state, ProcessState::NotStarted);
    }
}
