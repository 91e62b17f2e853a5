//! Asset Gatekeeper
//!
//! Main entry point for the download server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use asset_gatekeeper::logging::LoggingSystem;
use asset_gatekeeper::token::KeyPair;
use asset_gatekeeper::{GatekeeperConfig, GatekeeperServer, GatekeeperState};

/// Entitlement-gated asset download server
#[derive(Debug, Parser)]
#[command(name = "asset-gatekeeper", version, about)]
struct Cli {
    /// Address to listen on; `:8080` binds every interface
    #[arg(long, default_value = "0.0.0.0:8080", value_parser = parse_listen)]
    listen: SocketAddr,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print a freshly generated signing key pair and exit
    #[arg(long)]
    generate_key: bool,
}

fn parse_listen(value: &str) -> Result<SocketAddr, String> {
    let value = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => value.to_string(),
    };
    value
        .parse()
        .map_err(|e| format!("invalid listen address '{}': {}", value, e))
}

fn print_key_pair() {
    let pair = KeyPair::generate();
    println!("keys:");
    println!("  - hash_key: \"{}\"", pair.authentication_hex());
    println!("    block_key: \"{}\"", pair.encryption_hex());
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = GatekeeperConfig::load(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?
        .validate()?;

    // Keep the guards alive until shutdown so file output is flushed
    let _logging = LoggingSystem::init(settings.logging.clone())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        keys = settings.key_set.len(),
        skip_auth = settings.skip_auth.is_some(),
        "Starting asset gatekeeper"
    );

    let state = GatekeeperState::from_settings(&settings)?;
    GatekeeperServer::new(state).serve(cli.listen).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.generate_key {
        print_key_pair();
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
