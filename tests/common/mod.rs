//! Shared helpers: a recording mock backend and an in-process gateway.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::Router;
use tokio::sync::mpsc;

use osrm_gateway::config::BackendAddress;
use osrm_gateway::graph::GraphLocation;
use osrm_gateway::health::HealthProfile;
use osrm_gateway::lifecycle::LifecycleEvent;
use osrm_gateway::proxy::routing::RouteTable;
use osrm_gateway::server::{self, AppState, Stats};
use osrm_gateway::supervisor::{BackendCommand, Supervisor};

pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// Echoes what it received as JSON. `/teapot` answers 418 with a custom
/// header and `/tile.png` answers with binary bytes.
async fn echo(req: Request) -> Response {
    let (parts, body) = req.into_parts();
    match parts.uri.path() {
        "/teapot" => {
            return (
                StatusCode::IM_A_TEAPOT,
                [("x-backend", "osrm")],
                "short and stout",
            )
                .into_response();
        }
        "/tile.png" => {
            return ([("content-type", "image/png")], Body::from(PNG_MAGIC)).into_response();
        }
        _ => {}
    }

    let body = axum::body::to_bytes(body, 1 << 20).await.unwrap_or_default();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    Json(serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "host": header("host"),
        "custom": header("x-custom"),
        "body": String::from_utf8_lossy(&body),
    }))
    .into_response()
}

pub async fn start_mock_backend() -> BackendAddress {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().fallback(echo))
            .await
            .unwrap();
    });
    backend_at(addr)
}

fn backend_at(addr: SocketAddr) -> BackendAddress {
    match addr {
        SocketAddr::V4(v4) => BackendAddress {
            host: *v4.ip(),
            port: v4.port(),
        },
        SocketAddr::V6(_) => panic!("test listeners bind 127.0.0.1"),
    }
}

/// An address nothing listens on.
pub async fn closed_backend() -> BackendAddress {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    backend_at(addr)
}

pub struct TestSupervisor {
    pub supervisor: Arc<Supervisor>,
    pub events: mpsc::UnboundedReceiver<LifecycleEvent>,
    pub events_tx: mpsc::UnboundedSender<LifecycleEvent>,
    _graph_dir: tempfile::TempDir,
}

/// A supervisor whose "backend" is `sh -c <script>` over a valid graph dir.
pub fn shell_supervisor(script: &str) -> TestSupervisor {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("berlin.osrm"), b"").unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let command = BackendCommand {
        program: "sh".into(),
        args: vec!["-c".into(), script.into()],
    };
    TestSupervisor {
        supervisor: Arc::new(Supervisor::new(
            command,
            GraphLocation::new(dir.path(), "berlin"),
            tx.clone(),
        )),
        events: rx,
        events_tx: tx,
        _graph_dir: dir,
    }
}

/// Poll for a file a backend script creates, for up to three seconds.
pub async fn wait_for_file(path: &std::path::Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    false
}

pub fn backend_health() -> HealthProfile {
    HealthProfile::Backend {
        algorithm: "mld".into(),
        graph: "/data/berlin.osrm".into(),
    }
}

pub async fn start_gateway(
    supervisor: Arc<Supervisor>,
    backend: BackendAddress,
    routes: RouteTable,
    health: HealthProfile,
) -> SocketAddr {
    let state = Arc::new(AppState {
        supervisor,
        backend,
        routes,
        http_client: server::build_http_client(),
        health,
        timeout: Duration::from_secs(5),
        start_time: Instant::now(),
        stats: Stats::new(),
    });
    let router = server::build_router(state, 1_048_576);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
