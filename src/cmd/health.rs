//! `osrm-gateway health`: check the health of a running gateway.
//!
//! Sends a `GET /health` request to the specified URL and displays
//! the response as formatted text or raw JSON.

use std::time::Duration;

use axum::body::Body;
use http_body_util::BodyExt;

use crate::cli::HealthArgs;
use crate::error::GatewayError;
use crate::health::HealthResponse;
use crate::server::build_http_client;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(args: HealthArgs) -> Result<(), GatewayError> {
    let uri: http::Uri = format!("{}/health", args.url.trim_end_matches('/'))
        .parse()
        .map_err(|e: http::uri::InvalidUri| GatewayError::UriParse {
            source: Box::new(e),
        })?;

    let req = http::Request::get(uri)
        .body(Body::empty())
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?;

    let response = tokio::time::timeout(PROBE_TIMEOUT, build_http_client().request(req))
        .await
        .map_err(|_| GatewayError::HttpRequest {
            source: format!("health check timed out after {}s", PROBE_TIMEOUT.as_secs()).into(),
        })?
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::HttpRequest {
            source: Box::new(e),
        })?
        .to_bytes();

    if !status.is_success() {
        return Err(GatewayError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    let body_str = String::from_utf8_lossy(&body);
    match serde_json::from_str::<HealthResponse>(&body_str) {
        Ok(health) => print_summary(&args.url, &health),
        Err(e) => {
            eprintln!("Failed to parse health response: {e}");
            println!("{body_str}");
        }
    }

    Ok(())
}

fn print_summary(url: &str, health: &HealthResponse) {
    let Some(ref osrm) = health.osrm else {
        let service = health.service.as_deref().unwrap_or("gateway");
        println!("\u{2713} {service} is {} ({url})", health.status);
        return;
    };

    let mark = if osrm.running { "\u{2713}" } else { "\u{2717}" };
    println!("{mark} osrm-gateway is {} ({url})", health.status);
    if let Some(uptime) = health.uptime_seconds {
        println!("  uptime:         {}", format_uptime(uptime));
    }
    match osrm.pid {
        Some(pid) => println!("  backend:        {:?} (pid {pid})", osrm.state),
        None => println!("  backend:        {:?}", osrm.state),
    }
    if let Some(code) = osrm.exit_code {
        println!("  exit code:      {code}");
    }
    if let Some(signal) = osrm.signal {
        println!("  exit signal:    {signal}");
    }
    println!("  algorithm:      {}", osrm.algorithm);
    println!("  graph:          {}", osrm.graph);
    if let Some(ref stats) = health.stats {
        println!(
            "  requests:       {} forwarded, {} failed",
            stats.requests_forwarded, stats.requests_failed
        );
    }
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
    }
}
