use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = osrm_gateway::cli::Cli::parse();
    if let Err(e) = osrm_gateway::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
