//! osrm-gateway fronts an `osrm-routed` backend with a lightweight HTTP
//! gateway.
//!
//! It checks that a compiled graph is present, launches the backend as a
//! supervised child process, and reverse-proxies every request to it,
//! rewriting path prefixes where configured. `GET /health` reports the
//! backend process state without touching the network. A backend crash
//! ends the gateway; SIGINT or SIGTERM stop the backend first and then
//! exit cleanly.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, check, health).
//! - [`config`] -- Typed configuration resolved from flags and environment.
//! - [`engine`] -- Adapter serving routes from an in-process engine.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`graph`] -- Graph artifact availability check.
//! - [`health`] -- `GET /health` endpoint handler.
//! - [`lifecycle`] -- Signal handling and the process-wide shutdown decision.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Per-request start/end logging.
//! - [`proxy`] -- Path rewriting, header handling, and streaming forwarding.
//! - [`server`] -- Axum router, shared application state, and HTTP client.
//! - [`supervisor`] -- Backend process lifecycle.

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod health;
pub mod lifecycle;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod supervisor;
