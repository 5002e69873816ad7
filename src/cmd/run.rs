//! `osrm-gateway run`: launch the backend and start the gateway.
//!
//! Resolves configuration, starts the backend through the
//! [`Supervisor`], and only then binds the listener and serves. The
//! lifecycle loop owns shutdown from there on: signals stop the backend
//! and exit cleanly, a backend crash ends the gateway with the
//! backend's exit code.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cli::RunArgs;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::lifecycle::{self, RestartPolicy};
use crate::logging;
use crate::server::{self, AppState};
use crate::supervisor::Supervisor;

pub async fn execute(args: RunArgs) -> Result<(), GatewayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let config = GatewayConfig::from_args(&args)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(Supervisor::new(
        config.backend_command(),
        config.graph.clone(),
        events_tx.clone(),
    ));

    supervisor.start().await?;
    lifecycle::spawn_signal_listener(events_tx);

    let listener = match tokio::net::TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            supervisor.stop().await;
            return Err(e.into());
        }
    };

    let state = Arc::new(AppState::new(&config, Arc::clone(&supervisor)));
    let router = server::build_router(state, config.max_body);

    tracing::info!(
        addr = %config.listen,
        backend = %config.backend,
        mode = ?config.mode,
        routes = config.routes.routes().len(),
        "gateway listening, forwarding to osrm-routed"
    );

    let serve = async move { axum::serve(listener, router).await };
    let result = lifecycle::run(
        supervisor,
        events_rx,
        serve,
        RestartPolicy {
            max_restarts: config.max_restarts,
        },
    )
    .await;

    if result.is_ok() {
        tracing::info!("gateway stopped");
    }
    result
}
