//! Readyflow CLI - Command line interface for readyflow
//!
//! Moves issues referenced by freshly merged pull requests to the
//! "ready for verification" status of a project board and notifies them.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use readyflow_core::{CliOverrides, Config};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::SyncArgs;

/// Readyflow: sync issue status when pull requests merge
#[derive(Parser, Debug)]
#[command(name = "readyflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/readyflow/config.toml
    #[arg(long, global = true, env = "READYFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Run one sync pass over recently merged pull requests
    #[command(visible_alias = "s")]
    Sync(SyncArgs),

    /// Show the effective configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,readyflow=debug,readyflow_core=debug,readyflow_github=debug"
    } else {
        "info"
    };

    // Logs go to stderr so the summary on stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("readyflow {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Sync(args)) => {
            args.execute(cli.config.as_deref()).await?;
        }
        Some(Commands::Config) => {
            let config = Config::load_with_overrides(cli.config.as_deref(), CliOverrides::default())?;
            print_config(&config, cli.config)?;
        }
        None => {
            println!("readyflow - sync issue status when pull requests merge");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit_path: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Readyflow Configuration");
    println!("=======================");
    println!();
    println!("{}", config.to_toml()?);

    if let Some(path) = explicit_path.or_else(Config::default_config_path) {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }

    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {}", e);
    }

    Ok(())
}
