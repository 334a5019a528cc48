//! Cache command - inspect and clear cached results

use crate::cache::EntryInfo;
use crate::cli::args::{AppArgs, CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::lifecycle::fixture_options;
use crate::config::Config;
use crate::error::CdkTestResult;
use crate::fixture::CdkTest;
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> CdkTestResult<()> {
    match args.action {
        CacheAction::Path { app } => show_path(&app, config),
        CacheAction::List { app, format } => list_entries(&app, config, format).await,
        CacheAction::Clear { app, yes } => clear(&app, config, yes).await,
    }
}

fn show_path(app: &AppArgs, config: &Config) -> CdkTestResult<()> {
    let cdk = CdkTest::new(fixture_options(app, config))?;
    println!("{}", cdk.cache_dir().join(cdk.namespace()).display());
    Ok(())
}

/// List cached results for an app
async fn list_entries(app: &AppArgs, config: &Config, format: OutputFormat) -> CdkTestResult<()> {
    let cdk = CdkTest::new(fixture_options(app, config))?;
    let entries = cdk.cached_entries().await?;

    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cached results for {}.", cdk.appdir().display()),
        }
        return Ok(());
    }

    let current = cdk.cache_key();
    match format {
        OutputFormat::Table => print_entry_table(&entries, &current),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => print_entry_plain(&entries),
    }

    Ok(())
}

fn print_entry_table(entries: &[EntryInfo], current: &str) {
    println!(
        "{:<12} {:<70} {:>10} {:<8}",
        style("OPERATION").bold(),
        style("KEY").bold(),
        style("SIZE").bold(),
        style("STATE").bold()
    );
    println!("{}", "-".repeat(103));

    for entry in entries {
        let state = if entry.key == current {
            style("current").green()
        } else {
            style("stale").dim()
        };

        println!(
            "{:<12} {:<70} {:>10} {:<8}",
            entry.operation,
            entry.key,
            format_size(entry.size_bytes),
            state
        );
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn print_entry_plain(entries: &[EntryInfo]) {
    for entry in entries {
        println!("{}", entry.path.display());
    }
}

/// Remove cached results and synth output for an app
async fn clear(app: &AppArgs, config: &Config, skip_confirm: bool) -> CdkTestResult<()> {
    let cdk = CdkTest::new(fixture_options(app, config))?;
    let entries = cdk.cached_entries().await?;

    println!(
        "This will remove {} cached result(s) and the synth output of {}",
        entries.len(),
        cdk.appdir().display()
    );

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    cdk.teardown()?;
    println!("{} cleared {} cached result(s)", style("✓").green(), entries.len());

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
