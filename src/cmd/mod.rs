//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`check`], or [`health`]. Each handler
//! lives in its own submodule.

pub mod check;
pub mod health;
pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::GatewayError;

pub async fn dispatch(cli: Cli) -> Result<(), GatewayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Check(ref args)) => check::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  osrm-gateway v{version} - supervising gateway for osrm-routed\n\n  \
         No command provided. To get started:\n\n    \
         osrm-gateway check                Verify graph files (OSRM_DATA_DIR, OSRM_GRAPH_BASENAME)\n    \
         osrm-gateway run                  Launch osrm-routed and start proxying\n    \
         osrm-gateway --help               See all commands and options\n"
    );
}
