//! In-process routing engine adapter.
//!
//! When the routing engine is linked into the process instead of run as
//! a child, [`build_router`] turns `GET /route/v1/{profile}/{coordinates}`
//! into one [`RoutingEngine::route`] call and returns the engine's JSON
//! result as-is. Failures, including coordinates that do not parse as
//! numbers, become `500 {"code": "InternalError", "message": ...}`.
//!
//! The engine is constructed before the router exists, so a gateway
//! that is serving always has a loaded engine and its health is static.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;

use crate::error::GatewayError;
use crate::health::HealthResponse;
use crate::middleware;
use crate::server::json_error;

pub const SERVICE_NAME: &str = "osrm-native";

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One routing query as handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequest {
    pub profile: String,
    pub coordinates: Vec<[f64; 2]>,
    pub overview: String,
    pub geometries: String,
    pub steps: bool,
}

// async_trait is required here because engines are used as Arc<dyn RoutingEngine>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait RoutingEngine: Send + Sync {
    async fn route(&self, request: RouteRequest) -> Result<serde_json::Value, EngineError>;
}

/// Construct the engine, turning a failure into a fatal startup error.
pub fn load<E, F>(init: F) -> Result<Arc<dyn RoutingEngine>, GatewayError>
where
    E: RoutingEngine + 'static,
    F: FnOnce() -> Result<E, EngineError>,
{
    match init() {
        Ok(engine) => {
            tracing::info!("routing engine loaded");
            Ok(Arc::new(engine))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize routing engine");
            Err(GatewayError::EngineInit { message: e.message })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub overview: Option<String>,
    pub geometries: Option<String>,
    pub steps: Option<String>,
}

/// Parse `lon,lat;lon,lat;...` into numeric pairs.
pub fn parse_coordinates(raw: &str) -> Result<Vec<[f64; 2]>, EngineError> {
    raw.split(';')
        .map(|pair| {
            let mut parts = pair.split(',');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(lon), Some(lat), None) => {
                    let lon = lon.trim().parse::<f64>();
                    let lat = lat.trim().parse::<f64>();
                    match (lon, lat) {
                        (Ok(lon), Ok(lat)) if lon.is_finite() && lat.is_finite() => Ok([lon, lat]),
                        _ => Err(EngineError::new(format!("Coordinate '{pair}' is not numeric"))),
                    }
                }
                _ => Err(EngineError::new(format!(
                    "Coordinate '{pair}' is not a lon,lat pair"
                ))),
            }
        })
        .collect()
}

impl RouteRequest {
    pub fn from_parts(
        profile: String,
        coordinates: &str,
        query: RouteQuery,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            profile,
            coordinates: parse_coordinates(coordinates)?,
            overview: query.overview.unwrap_or_else(|| "simplified".into()),
            geometries: query.geometries.unwrap_or_else(|| "polyline".into()),
            steps: query.steps.as_deref() == Some("true"),
        })
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::service(SERVICE_NAME))
}

async fn route_handler(
    State(engine): State<Arc<dyn RoutingEngine>>,
    Path((profile, coordinates)): Path<(String, String)>,
    Query(query): Query<RouteQuery>,
) -> Response {
    let result = match RouteRequest::from_parts(profile, &coordinates, query) {
        Ok(request) => engine.route(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "route error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", &e.message)
        }
    }
}

pub fn build_router(engine: Arc<dyn RoutingEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/route/v1/{profile}/{coordinates}", get(route_handler))
        .layer(ServiceBuilder::new().layer(middleware::request_logger()))
        .with_state(engine)
}
