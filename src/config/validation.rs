//! Configuration validation with detailed error reporting.
//!
//! [`validate`] checks the run arguments for problems that would
//! otherwise surface later as confusing runtime failures: clashing
//! ports, unknown algorithms, malformed rewrite rules and graph names
//! that escape the data directory. Every problem is collected before
//! returning so the operator can fix them in one pass.

use crate::cli::{GatewayMode, GraphArgs, RunArgs};
use crate::error::ValidationError;
use crate::proxy::routing::ProxyRoute;

pub const VALID_ALGORITHMS: &[&str] = &["mld", "ch"];

/// Validate an algorithm name. Returns `Ok(())` or a human-readable error.
pub fn validate_algorithm(algorithm: &str) -> Result<(), String> {
    if VALID_ALGORITHMS.contains(&algorithm.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(format!("'{algorithm}' is not a supported algorithm"))
    }
}

/// Validate a graph basename. Returns `Ok(())` or a human-readable error.
pub fn validate_basename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("graph name cannot be empty".into());
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("'{name}' must be a file name, not a path"));
    }
    if let Some(stem) = name.strip_suffix(".osrm") {
        return Err(format!("'{name}' includes the .osrm extension (did you mean '{stem}'?)"));
    }
    Ok(())
}

pub fn validate_graph(graph: &GraphArgs) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_graph(graph, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_graph(graph: &GraphArgs, errors: &mut Vec<ValidationError>) {
    if let Err(message) = validate_basename(&graph.graph_basename) {
        errors.push(ValidationError {
            field: "graph".into(),
            message,
            suggestion: None,
        });
    }
    if let Err(message) = validate_algorithm(&graph.algorithm) {
        errors.push(ValidationError {
            field: "algorithm".into(),
            message,
            suggestion: Some(format!("valid: {}", VALID_ALGORITHMS.join(", "))),
        });
    }
}

pub fn validate(args: &RunArgs) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_graph(&args.graph, &mut errors);

    if args.backend_port == 0 {
        errors.push(ValidationError {
            field: "backend-port".into(),
            message: "backend port cannot be 0".into(),
            suggestion: Some("osrm-routed defaults to 5000".into()),
        });
    }

    let port = args.listen_port();
    if port == args.backend_port {
        let env = match args.mode {
            GatewayMode::Proxy => "PROXY_PORT",
            GatewayMode::Express => "EXPRESS_PORT",
        };
        errors.push(ValidationError {
            field: "port".into(),
            message: format!("gateway and backend both use port {port}"),
            suggestion: Some(format!("set {env} and OSRM_PORT to different values")),
        });
    }

    if args.timeout == 0 {
        errors.push(ValidationError {
            field: "timeout".into(),
            message: "timeout must be greater than 0".into(),
            suggestion: None,
        });
    }

    for rule in &args.rewrites {
        if rule.parse::<ProxyRoute>().is_err() {
            errors.push(ValidationError {
                field: "rewrite".into(),
                message: format!("'{rule}' is not a valid rewrite rule"),
                suggestion: Some("expected PREFIX=TARGET with both starting with '/'".into()),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
