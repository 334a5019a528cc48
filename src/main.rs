//! cdktest - CDK test fixture runner
//!
//! CLI entry point that dispatches to subcommands.

use cdktest::cli::{Cli, Commands};
use cdktest::config::{Config, ConfigManager};
use cdktest::error::{CdkTestError, CdkTestResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CdkTestResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| CdkTestError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    // Dispatch to command
    match cli.command {
        Commands::Synth(args) => cdktest::cli::commands::synth(args, &config).await,
        Commands::Deploy(args) => cdktest::cli::commands::deploy(args, &config).await,
        Commands::Destroy(args) => cdktest::cli::commands::destroy(args, &config).await,
        Commands::Bootstrap(args) => cdktest::cli::commands::bootstrap(args, &config).await,
        Commands::Fingerprint(args) => cdktest::cli::commands::fingerprint(args, &config).await,
        Commands::Cache(args) => cdktest::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            cdktest::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn, 1 = info (command lines, CLI output, cache hits), 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("cdktest=warn"),
        1 => EnvFilter::new("cdktest=info"),
        _ => EnvFilter::new("cdktest=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
