//! `osrm-gateway check`: verify graph artifacts without starting.
//!
//! Runs the same availability check `run` performs before launching
//! the backend and reports which artifact files are present.

use crate::cli::{CheckArgs, OutputFormat};
use crate::config::validation;
use crate::error::GatewayError;
use crate::graph::{self, GraphAvailability, GraphLocation};

pub async fn execute(args: &CheckArgs) -> Result<(), GatewayError> {
    validation::validate_graph(&args.graph)
        .map_err(|errors| GatewayError::ConfigValidation { errors })?;

    let location = GraphLocation::new(&args.graph.data_dir, &args.graph.graph_basename);
    let result = graph::check_availability(&location).await;

    match args.format {
        OutputFormat::Text => print_text(&location, &args.graph.algorithm, &result),
        OutputFormat::Json => print_json(&location, &args.graph.algorithm, &result),
    }

    result.map(|_| ())
}

fn print_text(
    location: &GraphLocation,
    algorithm: &str,
    result: &Result<GraphAvailability, GatewayError>,
) {
    match result {
        Ok(GraphAvailability::Primary) => {
            println!("\u{2713} {} is ready ({algorithm})", location.primary().display());
        }
        Ok(GraphAvailability::AlgorithmSpecific {
            partition,
            hierarchy,
        }) => {
            println!(
                "\u{26a0} {} missing, launching from algorithm-specific files",
                location.primary().display()
            );
            if *partition {
                println!("  found {}", location.partition().display());
            }
            if *hierarchy {
                println!("  found {}", location.hierarchy().display());
            }
        }
        Err(_) => {
            // The error itself is printed by main.
            println!("\u{2717} no usable graph for '{}'", location.basename);
        }
    }
}

fn print_json(
    location: &GraphLocation,
    algorithm: &str,
    result: &Result<GraphAvailability, GatewayError>,
) {
    let output = serde_json::json!({
        "valid": result.is_ok(),
        "graph": location.primary().display().to_string(),
        "algorithm": algorithm,
        "availability": result.as_ref().ok(),
        "error": result.as_ref().err().map(ToString::to_string),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
}
