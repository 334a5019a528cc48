//! Lifecycle commands - synth, deploy, destroy, bootstrap

use crate::cache::CallOptions;
use crate::cli::args::AppArgs;
use crate::config::Config;
use crate::error::CdkTestResult;
use crate::fixture::{CdkTest, FixtureOptions};
use crate::process::CommandOutput;
use console::style;
use std::time::Instant;

/// Build fixture options from configuration and command-line overrides
pub fn fixture_options(args: &AppArgs, config: &Config) -> FixtureOptions {
    let mut options = FixtureOptions::from_config(&args.appdir, config);

    if let Some(ref basedir) = args.basedir {
        options.basedir = Some(basedir.clone());
    }
    if let Some(ref binary) = args.binary {
        options.binary = binary.clone();
    }
    if let Some(ref dir) = args.cache_dir {
        options.cache_dir = Some(dir.clone());
    }
    if let Some(ref command) = args.app_command {
        options.app_command = command.clone();
    }
    options.env.extend(args.env.iter().cloned());
    options.enable_cache = options.enable_cache || args.cache;

    options
}

/// Execute `cdk synthesize`
pub async fn synth(args: AppArgs, config: &Config) -> CdkTestResult<()> {
    let (cdk, call) = prepare(&args, config)?;
    let started = Instant::now();
    let output = cdk.synthesize(call).await?;
    report("synthesize", &output, started);
    Ok(())
}

/// Execute `cdk deploy`
pub async fn deploy(args: AppArgs, config: &Config) -> CdkTestResult<()> {
    let (cdk, call) = prepare(&args, config)?;
    let started = Instant::now();
    let output = cdk.deploy(call).await?;
    report("deploy", &output, started);
    Ok(())
}

/// Execute `cdk destroy`
pub async fn destroy(args: AppArgs, config: &Config) -> CdkTestResult<()> {
    let (cdk, _) = prepare(&args, config)?;
    let started = Instant::now();
    let output = cdk.destroy().await?;
    report("destroy", &output, started);
    Ok(())
}

/// Execute `cdk bootstrap`
pub async fn bootstrap(args: AppArgs, config: &Config) -> CdkTestResult<()> {
    let (cdk, _) = prepare(&args, config)?;
    let started = Instant::now();
    let output = cdk.setup().await?;
    report("bootstrap", &output, started);
    Ok(())
}

fn prepare(args: &AppArgs, config: &Config) -> CdkTestResult<(CdkTest, CallOptions)> {
    let options = fixture_options(args, config);
    let call = CallOptions {
        use_cache: options.enable_cache,
    };
    Ok((CdkTest::new(options)?, call))
}

fn report(operation: &str, output: &CommandOutput, started: Instant) {
    print!("{}", output.out);
    if !output.err.is_empty() {
        eprint!("{}", output.err);
    }
    eprintln!(
        "{} {} ({:.1}s)",
        style("✓").green(),
        operation,
        started.elapsed().as_secs_f64()
    );
}
