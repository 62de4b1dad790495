mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;
use tracing_subscriber::EnvFilter;

/// Tabula: register, validate and activate table-format plugins
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dependency configuration file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register every format in a catalog and report admission results
    Check {
        /// Format catalog file
        #[arg(long)]
        catalog: PathBuf,
        /// Installed-package table
        #[arg(long)]
        installed: Option<PathBuf>,
    },
    /// Check that requirements shared by the catalog's formats are compatible
    Resolve {
        #[arg(long)]
        catalog: PathBuf,
    },
    /// Register and initialize every format, then shut them down again
    Activate {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        installed: Option<PathBuf>,
    },
}

/// Route `log` records from the core through a stderr `tracing` subscriber.
/// `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config = match commands::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match args.command {
        Commands::Check { catalog, installed } => {
            commands::check(&config, &catalog, installed.as_deref()).await
        }
        Commands::Resolve { catalog } => commands::resolve(&config, &catalog).await,
        Commands::Activate { catalog, installed } => {
            commands::activate(&config, &catalog, installed.as_deref()).await
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
