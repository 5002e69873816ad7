//! Integration tests for the in-process engine adapter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use osrm_gateway::engine::{self, EngineError, RouteRequest, RoutingEngine};

/// Records every request and answers with a canned result or failure.
struct RecordingEngine {
    calls: Mutex<Vec<RouteRequest>>,
    fail_with: Option<String>,
}

impl RecordingEngine {
    fn new(fail_with: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_with: fail_with.map(String::from),
        })
    }
}

#[async_trait]
impl RoutingEngine for RecordingEngine {
    async fn route(&self, request: RouteRequest) -> Result<serde_json::Value, EngineError> {
        self.calls.lock().unwrap().push(request);
        match self.fail_with {
            Some(ref message) => Err(EngineError::new(message.clone())),
            None => Ok(serde_json::json!({ "code": "Ok", "routes": [{ "distance": 1234.5 }] })),
        }
    }
}

async fn serve(engine: Arc<RecordingEngine>) -> std::net::SocketAddr {
    let router = engine::build_router(engine);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn route_becomes_one_engine_call() {
    let eng = RecordingEngine::new(None);
    let addr = serve(eng.clone()).await;

    let url = format!(
        "http://{addr}/route/v1/driving/13.4,52.5;13.5,52.6?overview=full&geometries=geojson&steps=true"
    );
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "Ok");
    assert_eq!(body["routes"][0]["distance"], 1234.5);

    let calls = eng.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].profile, "driving");
    assert_eq!(calls[0].coordinates, vec![[13.4, 52.5], [13.5, 52.6]]);
    assert_eq!(calls[0].overview, "full");
    assert_eq!(calls[0].geometries, "geojson");
    assert!(calls[0].steps);
}

#[tokio::test]
async fn engine_failure_is_500_internal_error() {
    let eng = RecordingEngine::new(Some("NoRoute: impossible route"));
    let addr = serve(eng.clone()).await;

    let resp = reqwest::get(format!("http://{addr}/route/v1/driving/13.4,52.5;13.5,52.6"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "code": "InternalError", "message": "NoRoute: impossible route" })
    );
}

#[tokio::test]
async fn malformed_coordinates_fail_like_the_engine() {
    let eng = RecordingEngine::new(None);
    let addr = serve(eng.clone()).await;

    let resp = reqwest::get(format!("http://{addr}/route/v1/driving/north,south"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "InternalError");
    assert!(eng.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn native_health() {
    let addr = serve(RecordingEngine::new(None)).await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "status": "ok", "service": "osrm-native" })
    );
}
