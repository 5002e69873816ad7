//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, check, health), and their associated argument
//! structs. Every flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "osrm-gateway",
    version,
    about = "Supervising reverse-proxy gateway for osrm-routed",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        osrm-gateway check                   Verify graph files in /data\n  \
        osrm-gateway run                     Launch osrm-routed and proxy to it\n  \
        osrm-gateway run --mode express      Express-style routes and health"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the routing backend and start the gateway
    Run(Box<RunArgs>),

    /// Check that graph files exist without starting anything
    Check(CheckArgs),

    /// Check health of a running gateway
    Health(HealthArgs),
}

/// Where the compiled graph lives and how the backend reads it.
#[derive(Args, Clone, Debug)]
pub struct GraphArgs {
    /// Graph basename (`<data-dir>/<graph>.osrm`)
    #[arg(long = "graph", env = "OSRM_GRAPH_BASENAME", default_value = "berlin")]
    pub graph_basename: String,

    /// Directory holding the graph artifacts
    #[arg(long, env = "OSRM_DATA_DIR", default_value = "/data")]
    pub data_dir: PathBuf,

    /// Query algorithm the backend is started with
    #[arg(long, env = "OSRM_ALGORITHM", default_value = "mld")]
    pub algorithm: String,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        osrm-gateway run                                 Defaults (berlin, mld, :5100 -> :5000)\n  \
        osrm-gateway run --graph germany --algorithm ch  Another graph\n  \
        osrm-gateway run --rewrite /v1=/route/v1         Extra path rewrite\n  \
        osrm-gateway run -p 8080 --pretty                Local dev mode")]
pub struct RunArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Port the backend listens on (loopback)
    #[arg(long, env = "OSRM_PORT", default_value_t = 5000)]
    pub backend_port: u16,

    /// Backend executable
    #[arg(long, env = "OSRM_BINARY", default_value = "osrm-routed")]
    pub backend_binary: PathBuf,

    /// Gateway listen port [default: 5100, or 5200 in express mode]
    #[arg(short, long, env = "PROXY_PORT")]
    pub port: Option<u16>,

    /// Listen port in express mode, takes precedence over --port there
    #[arg(long, env = "EXPRESS_PORT")]
    pub express_port: Option<u16>,

    /// Gateway listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Route layout and health format
    #[arg(short, long, env = "GATEWAY_MODE", default_value = "proxy")]
    pub mode: GatewayMode,

    /// Extra path rewrite, PREFIX=TARGET (evaluated before the built-in routes)
    #[arg(long = "rewrite", env = "ROUTE_REWRITES", value_delimiter = ',')]
    pub rewrites: Vec<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Upstream request timeout in milliseconds
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        help_heading = "Tuning"
    )]
    pub timeout: u64,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 10_485_760,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Relaunch a crashed backend this many times before giving up
    #[arg(
        long,
        env = "OSRM_MAX_RESTARTS",
        default_value_t = 0,
        help_heading = "Tuning"
    )]
    pub max_restarts: u32,
}

impl RunArgs {
    /// Port the gateway binds, after applying the mode's default.
    #[must_use]
    pub fn listen_port(&self) -> u16 {
        match self.mode {
            GatewayMode::Proxy => self.port.unwrap_or(DEFAULT_PROXY_PORT),
            GatewayMode::Express => self
                .express_port
                .or(self.port)
                .unwrap_or(DEFAULT_EXPRESS_PORT),
        }
    }
}

pub const DEFAULT_PROXY_PORT: u16 = 5100;
pub const DEFAULT_EXPRESS_PORT: u16 = 5200;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running gateway
    #[arg(default_value = "http://localhost:5100")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GatewayMode {
    /// Catch-all forwarding, health reports backend process state
    Proxy,
    /// `/route` rule plus catch-all, plain service health
    Express,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
