//! Tag-Harvest main entry point
//!
//! This is the command-line interface for the Tag-Harvest crawl pipeline.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tag_harvest::config::{load_config_with_hash, Config};
use tag_harvest::sites::{SelectorSite, SiteAdapter};
use tag_harvest::{Pipeline, RunOutput, RunScheduler, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tag-Harvest: concurrent listing → article crawler
///
/// Fetches the listing pages of a tagged feed, follows every item link and
/// extracts title, timestamp and body text from each article.
#[derive(Parser, Debug)]
#[command(name = "tag-harvest")]
#[command(version)]
#[command(about = "Concurrent listing and article crawler", long_about = None)]
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

    /// Run the pipeline once instead of on the configured interval
    #[arg(long)]
    once: bool,

    /// Validate config and show the seed URLs without fetching anything
    #[arg(long, conflicts_with = "once")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let site = SelectorSite::from_config(&config.site)?;

    if cli.dry_run {
        handle_dry_run(&config, &site);
        return Ok(());
    }

    handle_harvest(config, site, cli.once).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tag_harvest=info,warn"),
            1 => EnvFilter::new("tag_harvest=debug,info"),
            2 => EnvFilter::new("tag_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what a run would fetch
fn handle_dry_run(config: &Config, site: &SelectorSite) {
    println!("=== Tag-Harvest Dry Run ===\n");

    println!("Pipeline:");
    println!("  Fetch limit: {}", config.pipeline.fetch_limit);
    println!("  Worker threads: {}", config.pipeline.worker_count);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!("  Max body size: {} bytes", config.fetch.max_body_bytes);

    println!("\nSchedule:");
    println!("  Interval: {}s", config.schedule.interval_secs);
    println!(
        "  Backoff: {}s .. {}s",
        config.schedule.initial_backoff_secs, config.schedule.max_backoff_secs
    );

    let definition = site.definition();
    println!("\nSite '{}' ({}):", definition.name, definition.base_url);
    println!("  Links: {}", definition.link_selector);
    println!("  Title: {}", definition.title_selector);
    println!(
        "  Timestamp: {} [{}]",
        definition.timestamp_selector, definition.timestamp_attr
    );
    println!("  Body: {}", definition.body_selector);

    let seeds = site.seed_urls();
    println!("\nSeed URLs ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest loop
async fn handle_harvest(
    config: Config,
    site: SelectorSite,
    once: bool,
) -> anyhow::Result<()> {
    let pool = Arc::new(WorkerPool::new(config.pipeline.worker_count)?);
    pool.start()?;

    let pipeline = Pipeline::from_config(&config, Arc::new(site), Arc::clone(&pool))?;
    let mut scheduler = RunScheduler::new(&config.schedule);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing up");
            on_signal.cancel();
        }
    });

    let max_runs = once.then_some(1);
    let result = scheduler
        .run(&pipeline, &cancel, max_runs, report_run)
        .await;

    pool.stop();

    match result {
        Ok(runs) => {
            tracing::info!("Harvest stopped after {} runs", runs);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Logs the outcome of one run
fn report_run(output: RunOutput) {
    for failure in output.failures() {
        if let Err(e) = &failure.result {
            tracing::debug!("No record for {}: {}", failure.url, e);
        }
    }

    for record in output.into_records().iter().filter(|r| !r.is_empty()) {
        tracing::info!("{} | {} | {}", record.timestamp, record.source, record.title);
    }
}
