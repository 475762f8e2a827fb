//! Tidepool main entry point
//!
//! This is the command-line interface for the Tidepool dataset crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tidepool::checkpoint::CheckpointFile;
use tidepool::config::{load_config_with_hash, validate, Config};
use tidepool::crawler::{crawl, StopReason};
use tidepool::output::{load_statistics, print_statistics};
use tidepool::storage::SqliteStorage;
use tracing_subscriber::EnvFilter;

/// Tidepool: a breadth-first dataset crawler
///
/// Tidepool crawls outward from its seed URLs, records every page in a
/// SQLite store and bundles fetched pages into numbered tar.gz datasets.
/// While a crawl runs, type `p` and Enter to pause or resume, and `q` and
/// Enter (or Ctrl-C) to stop cleanly.
#[derive(Parser, Debug)]
#[command(name = "tidepool")]
#[command(version)]
#[command(about = "A breadth-first dataset crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the saved queue and start from the seeds
    #[arg(long)]
    fresh: bool,

    /// Seed URL to use instead of the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.seeds.is_empty() {
        tracing::info!("Using {} seed URLs from the command line", cli.seeds.len());
        config.crawler.seeds = cli.seeds.clone();
        validate(&config).context("Invalid --seed")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidepool=info,warn"),
            1 => EnvFilter::new("tidepool=debug,info"),
            2 => EnvFilter::new("tidepool=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration and queue
fn handle_dry_run(config: &Config) {
    println!("=== Tidepool Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pages per archive: {}", config.crawler.pages_per_archive);
    println!("  Checkpoint interval: {} pages", config.crawler.checkpoint_interval);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Pause poll interval: {}ms", config.crawler.pause_poll_ms);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Staging directory: {}", config.output.staging_dir);
    println!("  Archive directory: {}", config.output.archive_dir);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    let saved = CheckpointFile::new(config.output.checkpoint_path()).load();

    println!("\n✓ Configuration is valid");
    if saved.is_empty() {
        println!("✓ Would start crawling from {} seed URLs", config.crawler.seeds.len());
    } else {
        println!("✓ Would resume from a checkpoint of {} pending URLs", saved.len());
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(&config.output.database_path())
        .context("Failed to open result store")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved queue)");
    } else {
        tracing::info!("Starting crawl (will resume from saved queue if present)");
    }
    tracing::info!("Controls: 'p' + Enter pauses/resumes, 'q' + Enter or Ctrl-C stops");

    match crawl(config, config_hash, fresh).await {
        Ok(summary) => {
            match summary.stop_reason {
                StopReason::Exhausted => tracing::info!("Crawl completed successfully"),
                StopReason::Quit => tracing::info!(
                    "Crawl stopped; {} URLs saved for the next run",
                    summary.pending_remaining
                ),
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
