//! Catalog-Ripple main entry point
//!
//! This is the command-line interface for the Catalog-Ripple harvester.

use anyhow::Context;
use catalog_ripple::config::{load_config_with_hash, Config};
use catalog_ripple::url::listing_url;
use catalog_ripple::{CatalogPipeline, PageQuery};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Catalog-Ripple: a concurrent catalog page harvester
///
/// Fetches listing pages from a video-catalog site, extracts one record per
/// item and resolves each record's stream link from its detail page.
#[derive(Parser, Debug)]
#[command(name = "catalog-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent catalog page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Show the resolved configuration and target URL without fetching
    #[arg(long, global = true)]
    dry_run: bool,

    /// Abort the whole operation after this many seconds
    #[arg(long, value_name = "SECS", global = true)]
    deadline_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one listing page and print it as JSON
    Page {
        /// Category identifier
        #[arg(long)]
        category: u32,

        /// Listing page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Maximum records to return (1-100)
        #[arg(long, default_value_t = 20)]
        page_size: usize,

        /// Site root, overriding the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Walk several categories and print every record as JSON
    Sweep {
        /// Comma-separated category identifiers
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<u32>,

        /// Pages to read per category
        #[arg(long, default_value_t = 1)]
        max_pages: u32,

        /// Records kept per listing page (1-100)
        #[arg(long, default_value_t = 20)]
        page_size: usize,

        /// Site root, overriding the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config, &cli.command);
    }

    let pipeline = CatalogPipeline::new(&config).context("failed to build HTTP client")?;
    let deadline = cli.deadline_secs.map(Duration::from_secs);

    match cli.command {
        Command::Page {
            category,
            page,
            page_size,
            base_url,
        } => {
            let base = base_url.unwrap_or_else(|| config.site.base_url.clone());
            let query = PageQuery::new(base, category, page, page_size)?;
            let result = with_deadline(deadline, pipeline.get_videos(&query)).await??;
            print_json(&result)?;
        }
        Command::Sweep {
            categories,
            max_pages,
            page_size,
            base_url,
        } => {
            let base = base_url.unwrap_or_else(|| config.site.base_url.clone());
            let result = with_deadline(
                deadline,
                pipeline.sweep(&base, &categories, max_pages, page_size),
            )
            .await??;
            print_json(&result)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_ripple=info,warn"),
            1 => EnvFilter::new("catalog_ripple=debug,info"),
            2 => EnvFilter::new("catalog_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs a future, dropping it (and every fetch it owns) if the deadline passes
async fn with_deadline<F: Future>(
    deadline: Option<Duration>,
    future: F,
) -> anyhow::Result<F::Output> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .with_context(|| format!("deadline of {:?} exceeded", limit)),
        None => Ok(future.await),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handles the --dry-run mode: shows configuration and the first listing URL
fn handle_dry_run(config: &Config, command: &Command) -> anyhow::Result<()> {
    println!("=== Catalog-Ripple Dry Run ===\n");

    println!("Fetcher:");
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!("  Base delay: {}ms", config.fetcher.base_delay_ms);
    println!("  Max delay: {}ms", config.fetcher.max_delay_ms);
    println!("  Jitter: {}", config.fetcher.jitter);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);

    println!("\nFan-out:");
    println!(
        "  Max concurrent details: {}",
        config.fan_out.max_concurrent_details
    );
    println!("  Detail attempts: {}", config.fan_out.detail_max_attempts);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing path: {}", config.site.listing_path);
    println!("  Detail path: {}", config.site.detail_path);

    let (base, category, page) = match command {
        Command::Page {
            category,
            page,
            base_url,
            ..
        } => (base_url.as_deref(), *category, *page),
        Command::Sweep {
            categories,
            base_url,
            ..
        } => (
            base_url.as_deref(),
            categories.first().copied().unwrap_or(1),
            1,
        ),
    };
    let base = base.unwrap_or(&config.site.base_url);
    let url = listing_url(base, &config.site, category, page)?;

    println!("\n✓ Configuration is valid");
    println!("✓ Would start by fetching {}", url);

    Ok(())
}
