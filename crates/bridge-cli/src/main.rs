//! Escrow Bridge CLI: open and track escrowed stablecoin settlements.
//!
//! Subcommands: init, balance, pay, status, health.

mod commands;

use bridge_core::config::LoggingConfig;
use bridge_core::BridgeConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use commands::CommandFailure;

/// Escrow Bridge settlement client.
#[derive(Parser, Debug)]
#[command(name = "escrow-bridge", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "escrow-bridge.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Run against an in-memory escrow, registry and status service.
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Show wallet, contract and free balances.
    Balance(commands::balance::BalanceArgs),
    /// Open an escrow and wait for settlement.
    Pay(commands::pay::PayArgs),
    /// Query or watch the settlement status of an escrow.
    Status(commands::status::StatusArgs),
    /// Check the bridge API and show its fee and escrow window.
    Health(commands::health::HealthArgs),
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Exit code for a failed command.
fn failure_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CommandFailure>()
        .map_or(1, |failure| failure.code)
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };
    match err.downcast_ref::<CommandFailure>() {
        Some(failure) => eprintln!("{}", failure.message),
        None => eprintln!("Error: {err:#}"),
    }
    ExitCode::from(failure_code(&err))
}

#[tokio::main]
async fn main() -> ExitCode {
    report(run(Cli::parse()).await)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init(args) = &cli.command {
        return commands::init::run(&cli.config, args);
    }

    let mut config = BridgeConfig::load(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging);

    let ctx = commands::Context {
        config,
        simulate: cli.simulate,
    };

    match &cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Balance(args) => commands::balance::run(&ctx, args).await,
        Commands::Pay(args) => commands::pay::run(&ctx, args).await,
        Commands::Status(args) => commands::status::run(&ctx, args).await,
        Commands::Health(args) => commands::health::run(&ctx, args).await,
    }
}
