//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cdktest - run CDK apps the way the test fixture does
///
/// Synthesizes, deploys and destroys a CDK app directory, reusing cached
/// results when neither the app nor the environment changed.
#[derive(Parser, Debug)]
#[command(name = "cdktest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CDKTEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .cdktest.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize the app's CloudFormation templates
    #[command(alias = "synthesize")]
    Synth(AppArgs),

    /// Deploy the app's stacks
    Deploy(AppArgs),

    /// Destroy the app's stacks (never cached)
    Destroy(AppArgs),

    /// Bootstrap the target environment (never cached)
    Bootstrap(AppArgs),

    /// Print the fingerprints an app directory currently has
    Fingerprint(AppArgs),

    /// Inspect or clear cached results
    Cache(CacheArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments shared by every command that targets an app directory
#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// CDK app directory (relative to --basedir)
    pub appdir: PathBuf,

    /// Base directory (defaults to current directory)
    #[arg(short, long)]
    pub basedir: Option<PathBuf>,

    /// CDK binary, optionally with leading arguments (e.g. "npx cdk")
    #[arg(long)]
    pub binary: Option<String>,

    /// Serve synth/deploy from the result cache when possible
    #[arg(long)]
    pub cache: bool,

    /// Cache root directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Additional environment variables (KEY=VALUE)
    #[arg(short, long, value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// App command used when the app has no cdk.json
    #[arg(long)]
    pub app_command: Option<String>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show where results for an app are stored
    Path {
        #[command(flatten)]
        app: AppArgs,
    },

    /// List cached results for an app
    List {
        #[command(flatten)]
        app: AppArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove cached results and synth output for an app
    Clear {
        #[command(flatten)]
        app: AppArgs,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse environment variable in KEY=VALUE format
fn parse_env_var(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE format: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}
