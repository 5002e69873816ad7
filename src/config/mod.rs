//! Typed gateway configuration.
//!
//! [`GatewayConfig`] is resolved once from the parsed [`RunArgs`] and is
//! read-only afterwards. It carries the graph location, the backend
//! command line and [`BackendAddress`], the listen address, and the
//! ordered [`RouteTable`] for the selected [`GatewayMode`].

pub mod validation;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{GatewayMode, RunArgs};
use crate::error::GatewayError;
use crate::graph::GraphLocation;
use crate::proxy::routing::{ProxyRoute, RouteTable};
use crate::supervisor::BackendCommand;

/// Where forwarded traffic goes. The backend always listens on loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendAddress {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl BackendAddress {
    #[must_use]
    pub const fn loopback(port: u16) -> Self {
        Self {
            host: Ipv4Addr::LOCALHOST,
            port,
        }
    }

    /// Value for the `Host` header of forwarded requests.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub graph: GraphLocation,
    pub algorithm: String,
    pub backend: BackendAddress,
    pub backend_binary: PathBuf,
    pub listen: SocketAddr,
    pub mode: GatewayMode,
    pub routes: RouteTable,
    pub timeout: Duration,
    pub max_body: usize,
    pub max_restarts: u32,
}

impl GatewayConfig {
    pub fn from_args(args: &RunArgs) -> Result<Self, GatewayError> {
        validation::validate(args).map_err(|errors| GatewayError::ConfigValidation { errors })?;

        let mut rules = args
            .rewrites
            .iter()
            .map(|r| r.parse::<ProxyRoute>())
            .collect::<Result<Vec<_>, _>>()?;
        rules.extend(mode_routes(args.mode));

        let listen: SocketAddr = format!("{}:{}", args.host, args.listen_port()).parse()?;

        Ok(Self {
            graph: GraphLocation::new(&args.graph.data_dir, &args.graph.graph_basename),
            algorithm: args.graph.algorithm.to_ascii_lowercase(),
            backend: BackendAddress::loopback(args.backend_port),
            backend_binary: args.backend_binary.clone(),
            listen,
            mode: args.mode,
            routes: RouteTable::new(rules),
            timeout: Duration::from_millis(args.timeout),
            max_body: args.max_body,
            max_restarts: args.max_restarts,
        })
    }

    /// `osrm-routed --algorithm <alg> --port <port> <graph>`
    #[must_use]
    pub fn backend_command(&self) -> BackendCommand {
        BackendCommand {
            program: self.backend_binary.clone(),
            args: vec![
                "--algorithm".into(),
                self.algorithm.clone(),
                "--port".into(),
                self.backend.port.to_string(),
                self.graph.primary().display().to_string(),
            ],
        }
    }
}

/// Built-in rules for each mode, ahead of the catch-all.
fn mode_routes(mode: GatewayMode) -> Vec<ProxyRoute> {
    match mode {
        GatewayMode::Proxy => Vec::new(),
        GatewayMode::Express => vec![ProxyRoute::new("/route", "/route")],
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["osrm-gateway", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn backend_command_line() {
        let config = GatewayConfig::from_args(&run_args(&[
            "--graph",
            "germany",
            "--algorithm",
            "ch",
            "--backend-port",
            "5001",
            "--data-dir",
            "/srv/osrm",
        ]))
        .unwrap();
        let cmd = config.backend_command();
        assert_eq!(cmd.program, PathBuf::from("osrm-routed"));
        assert_eq!(
            cmd.args,
            vec!["--algorithm", "ch", "--port", "5001", "/srv/osrm/germany.osrm"]
        );
        assert_eq!(config.backend.to_string(), "http://127.0.0.1:5001");
    }

    #[test]
    fn proxy_mode_is_catch_all_only() {
        let config = GatewayConfig::from_args(&run_args(&[])).unwrap();
        assert_eq!(config.routes.routes(), &[ProxyRoute::catch_all()]);
    }

    #[test]
    fn express_mode_adds_route_rule() {
        let config = GatewayConfig::from_args(&run_args(&["--mode", "express"])).unwrap();
        assert_eq!(
            config.routes.routes(),
            &[ProxyRoute::new("/route", "/route"), ProxyRoute::catch_all()]
        );
    }

    #[test]
    fn user_rewrites_come_first() {
        let config =
            GatewayConfig::from_args(&run_args(&["--mode", "express", "--rewrite", "/v1=/route/v1"]))
                .unwrap();
        assert_eq!(config.routes.routes()[0], ProxyRoute::new("/v1", "/route/v1"));
        assert_eq!(config.routes.routes().len(), 3);
    }

    #[test]
    fn algorithm_is_passed_lowercase() {
        let config = GatewayConfig::from_args(&run_args(&["--algorithm", "MLD"])).unwrap();
        assert_eq!(config.algorithm, "mld");
        assert_eq!(&config.backend_command().args[..2], &["--algorithm", "mld"]);
    }

    #[test]
    fn express_mode_binds_express_port() {
        let config = GatewayConfig::from_args(&run_args(&["--mode", "express"])).unwrap();
        assert_eq!(config.listen.port(), 5200);
        let config = GatewayConfig::from_args(&run_args(&[])).unwrap();
        assert_eq!(config.listen.port(), 5100);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = GatewayConfig::from_args(&run_args(&["--port", "5000"])).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigValidation { .. }));
    }
}
