//! Axum server setup and shared application state.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the supervisor,
//! backend address, route table, HTTP client and counters),
//! [`build_router`] for constructing the Axum router with middleware
//! layers, and [`build_http_client`] for the connection-pooled hyper
//! client used to reach the backend.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::cli::GatewayMode;
use crate::config::{BackendAddress, GatewayConfig};
use crate::health::{health_handler, HealthProfile};
use crate::middleware;
use crate::proxy::{self, routing::RouteTable};
use crate::supervisor::Supervisor;

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpClient = Client<HttpConnector, Body>;

pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub backend: BackendAddress,
    pub routes: RouteTable,
    pub http_client: HttpClient,
    pub health: HealthProfile,
    pub timeout: Duration,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(config: &GatewayConfig, supervisor: Arc<Supervisor>) -> Self {
        let health = match config.mode {
            GatewayMode::Proxy => HealthProfile::Backend {
                algorithm: config.algorithm.clone(),
                graph: config.graph.primary().display().to_string(),
            },
            GatewayMode::Express => HealthProfile::Service("osrm-express"),
        };
        Self {
            supervisor,
            backend: config.backend,
            routes: config.routes.clone(),
            http_client: build_http_client(),
            health,
            timeout: config.timeout,
            start_time: Instant::now(),
            stats: Stats::new(),
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(HttpConnector::new())
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::request_logger())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

/// `{"code": ..., "message": ...}` with the given status.
pub fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "code": code, "message": message })),
    )
        .into_response()
}
