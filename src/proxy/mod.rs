//! Core HTTP request forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every non-`/health` request, resolves it against the route table
//! ([`routing`]), rebuilds its headers ([`headers`]), and streams it to
//! the backend. The backend's status, headers and body are streamed
//! back unchanged apart from hop-by-hop headers.

pub mod headers;
pub mod routing;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::Response;

use crate::server::{json_error, AppState};

#[allow(clippy::cast_possible_truncation)]
pub async fn forward_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let (route_idx, path) = state.routes.resolve(parts.uri.path());
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    let uri: Uri = match format!("{}{path_and_query}", state.backend).parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(path = %path_and_query, error = %e, "unforwardable request path");
            return json_error(StatusCode::BAD_REQUEST, "InvalidUrl", &e.to_string());
        }
    };

    tracing::debug!(
        method = %parts.method,
        route = %state.routes.routes()[route_idx].prefix,
        upstream = %uri,
        "forwarding request"
    );

    let mut upstream = axum::http::Request::new(body);
    *upstream.method_mut() = parts.method;
    *upstream.uri_mut() = uri;
    *upstream.headers_mut() = headers::build_forwarded_headers(&parts.headers, &state.backend);

    match tokio::time::timeout(state.timeout, state.http_client.request(upstream)).await {
        Ok(Ok(response)) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            let (mut parts, body) = response.into_parts();
            headers::strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(backend = %state.backend, error = %e, "backend unreachable");
            json_error(
                StatusCode::BAD_GATEWAY,
                "BadGateway",
                &format!("backend unreachable: {e}"),
            )
        }
        Err(_) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                backend = %state.backend,
                timeout_ms = state.timeout.as_millis() as u64,
                "backend timed out"
            );
            json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "GatewayTimeout",
                "backend did not respond in time",
            )
        }
    }
}
