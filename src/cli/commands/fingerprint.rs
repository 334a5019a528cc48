//! Fingerprint command - show what the cache would key on

use crate::cli::args::AppArgs;
use crate::cli::commands::lifecycle::fixture_options;
use crate::config::Config;
use crate::error::{CdkTestError, CdkTestResult};
use crate::fixture::{operations, CdkTest};
use console::style;

/// Execute the fingerprint command
pub async fn execute(args: AppArgs, config: &Config) -> CdkTestResult<()> {
    let cdk = CdkTest::new(fixture_options(&args, config))?;

    if !cdk.appdir().is_dir() {
        return Err(CdkTestError::AppDirNotFound(cdk.appdir().to_path_buf()));
    }

    println!("{:<12} {}", style("App").bold(), cdk.appdir().display());
    println!("{:<12} {}", style("Directory").bold(), cdk.app_fingerprint());
    println!("{:<12} {}", style("Key").bold(), cdk.cache_key());
    println!();

    for operation in operations::CACHEABLE {
        let path = cdk.entry_path(operation);
        let state = if path.is_file() {
            style("hit").green()
        } else {
            style("miss").dim()
        };
        println!("{:<12} {} [{}]", operation, path.display(), state);
    }

    Ok(())
}
