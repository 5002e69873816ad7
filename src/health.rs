//! `GET /health` endpoint handler.
//!
//! Answers from in-memory state only; no request is made to the
//! backend, so `running: true` means the process is alive, not that it
//! is ready to answer routing queries.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;
use crate::supervisor::ProcessState;

/// Which health payload a gateway serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthProfile {
    /// Report the supervised process, its algorithm and graph.
    Backend { algorithm: String, graph: String },
    /// Report only a fixed service name.
    Service(&'static str),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osrm: Option<BackendHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsResponse>,
}

impl HealthResponse {
    #[must_use]
    pub fn service(name: &str) -> Self {
        Self {
            status: "ok".into(),
            service: Some(name.to_string()),
            osrm: None,
            uptime_seconds: None,
            stats: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendHealth {
    pub running: bool,
    pub algorithm: String,
    pub graph: String,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (algorithm, graph) = match &state.health {
        HealthProfile::Service(name) => return Json(HealthResponse::service(name)),
        HealthProfile::Backend { algorithm, graph } => (algorithm, graph),
    };

    let status = state.supervisor.status().await;
    let exit = status.exit;

    Json(HealthResponse {
        status: "ok".into(),
        service: None,
        osrm: Some(BackendHealth {
            running: status.is_running(),
            algorithm: algorithm.clone(),
            graph: graph.clone(),
            state: status.state,
            pid: status.pid,
            exit_code: exit.and_then(|e| e.code),
            signal: exit.and_then(|e| e.signal),
        }),
        uptime_seconds: Some(state.start_time.elapsed().as_secs()),
        stats: Some(StatsResponse {
            requests_forwarded: state.stats.forwarded.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        }),
    })
}
