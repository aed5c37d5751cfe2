//! Places-Harvest main entry point
//!
//! This is the command-line interface for the Places-Harvest business
//! listing harvester.

use anyhow::{Context, Result};
use clap::Parser;
use places_harvest::browser::ChromiumDriver;
use places_harvest::config::{load_config_with_hash, Config};
use places_harvest::output::{export_json, load_statistics, print_report, print_statistics};
use places_harvest::storage::SqliteStorage;
use places_harvest::url::build_search_url;
use places_harvest::{Harvester, HarvestRequest};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Places-Harvest: an incremental business-listing harvester
///
/// Searches a map service for businesses matching a query and location,
/// extracts each result's details and stores them, resuming from where the
/// previous run for the same search stopped.
#[derive(Parser, Debug)]
#[command(name = "places-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental business-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// What to search for, e.g. "dentists"
    #[arg(long, required_unless_present = "stats")]
    query: Option<String>,

    /// Where to search, e.g. "Austin, TX"
    #[arg(long, default_value = "")]
    location: String,

    /// Number of records to collect
    #[arg(long, required_unless_present_any = ["stats", "dry_run"])]
    count: Option<usize>,

    /// Scan the result list from the top instead of the stored cursor
    #[arg(long)]
    fresh: bool,

    /// Write the run's records to this JSON file (overrides output.export-path)
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the search that would run
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, config_hash, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("places_harvest=info,warn"),
            1 => EnvFilter::new("places_harvest=debug,info"),
            2 => EnvFilter::new("places_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration and search URL
fn handle_dry_run(config: &Config, cli: &Cli) -> Result<()> {
    let query = cli.query.as_deref().unwrap_or_default();
    let search_url = build_search_url(&config.search.base_url, query, &cli.location)?;

    println!("=== Places-Harvest Dry Run ===\n");

    println!("Search:");
    println!("  Query: {}", query);
    println!("  Location: {}", cli.location);
    println!("  URL: {}", search_url);
    if let Some(count) = cli.count {
        println!("  Target: {} records", count);
    }

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Timeouts: navigation {}ms, element {}ms",
        config.browser.navigation_timeout_ms, config.browser.element_timeout_ms
    );

    println!("\nHarvest:");
    println!(
        "  Scroll budget: {} (stall window {})",
        config.harvest.max_scroll_attempts, config.harvest.stall_window
    );
    println!(
        "  Commit attempts: {} (backoff from {}ms)",
        config.harvest.commit_attempts, config.harvest.backoff_base_ms
    );
    println!("  Default country code: +{}", config.harvest.default_country_code);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = export_path(config, cli) {
        println!("  Export: {}", path.display());
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest run
async fn handle_harvest(config: Config, config_hash: String, cli: &Cli) -> Result<()> {
    let query = cli.query.clone().context("--query is required")?;
    let count = cli.count.context("--count is required")?;
    let request = HarvestRequest::new(query, cli.location.clone(), count).fresh(cli.fresh);
    let export = export_path(&config, cli);

    if cli.fresh {
        tracing::info!("Starting fresh scan (ignoring stored cursor)");
    }

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let driver = ChromiumDriver::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;

    let mut harvester = Harvester::new(driver, storage, config).with_config_hash(config_hash);

    let mut last_percent = None;
    let report = harvester
        .run(&request, &mut |percent, records| {
            if last_percent != Some(percent) {
                tracing::info!("Progress: {}% ({} records)", percent, records.len());
                last_percent = Some(percent);
            }
        })
        .await;

    harvester.driver_mut().shutdown().await;

    if let Some(path) = export {
        if let Err(e) = export_json(&report, &path) {
            tracing::error!("Failed to export records to {}: {}", path.display(), e);
        }
    }

    print_report(&report);
    if !report.is_complete() {
        tracing::warn!(
            "Shortfall: collected {} of {} requested records",
            report.achieved(),
            report.requested
        );
    }

    Ok(())
}

fn export_path(config: &Config, cli: &Cli) -> Option<PathBuf> {
    cli.export
        .clone()
        .or_else(|| config.output.export_path.as_ref().map(PathBuf::from))
}
