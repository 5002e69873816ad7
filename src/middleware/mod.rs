//! Request logging hooks for `tower-http`'s [`TraceLayer`].
//!
//! Every request gets a span carrying its method, URL and correlation id
//! (from `x-correlation-id`, or a fresh UUID). Inside that span a
//! `request_start` event is emitted when the request arrives and a
//! `request_end` event with status and duration when the response head
//! is ready.

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, OnRequest, OnResponse, TraceLayer};
use tracing::Span;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let correlation_id = request
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
        tracing::info_span!(
            "request",
            method = %request.method(),
            url = %request.uri(),
            correlation_id = %correlation_id,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestStart;

impl<B> OnRequest<B> for LogRequestStart {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        tracing::info!(event = "request_start", "request started");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestEnd;

impl<B> OnResponse<B> for LogRequestEnd {
    #[allow(clippy::cast_possible_truncation)]
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        tracing::info!(
            event = "request_end",
            status = response.status().as_u16(),
            duration = %format_duration(latency),
            elapsed_ms = latency.as_millis() as u64,
            "request completed"
        );
    }
}

pub type RequestLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, LogRequestStart, LogRequestEnd>;

#[must_use]
pub fn request_logger() -> RequestLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(LogRequestStart)
        .on_response(LogRequestEnd)
}

/// `850ms` below one second, `1.25s` above.
#[must_use]
pub fn format_duration(latency: Duration) -> String {
    let millis = latency.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.2}s", latency.as_secs_f64())
    }
}
