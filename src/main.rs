//! Tile-Ripple main entry point
//!
//! This is the command-line interface for the Tile-Ripple tileset mirror.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tile_ripple::config::{load_config, validate, Config, ConfigOverrides, Traversal};
use tile_ripple::crawler::{parse_roots, run_crawl};
use tracing_subscriber::EnvFilter;

/// Tile-Ripple: a resumable 3D Tiles mirror
///
/// Tile-Ripple walks one or more root tileset documents, downloads every
/// nested tileset and tile payload, and mirrors them under the output
/// directory. Progress is stored in SQLite, so rerunning the same command
/// continues an interrupted crawl.
#[derive(Parser, Debug)]
#[command(name = "tile-ripple")]
#[command(version)]
#[command(about = "A resumable 3D Tiles mirror", long_about = None)]
struct Cli {
    /// Root tileset URLs
    #[arg(value_name = "URL", required_unless_present = "stats")]
    roots: Vec<String>,

    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory for mirrored files and the crawl database
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long, value_name = "N")]
    workers: Option<usize>,

    /// Traversal order
    #[arg(long, value_enum)]
    traversal: Option<Traversal>,

    /// Attempts per URI within one run
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate configuration and roots, then exit without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    config.apply_overrides(ConfigOverrides {
        output_dir: cli.output.clone(),
        workers: cli.workers,
        traversal: cli.traversal,
        max_attempts: cli.retries,
    });
    validate(&config).context("invalid configuration")?;

    if cli.stats {
        handle_stats(&config)
    } else if cli.dry_run {
        handle_dry_run(&config, &cli.roots)
    } else {
        handle_crawl(config, &cli.roots).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the per-URI progress lines.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tile_ripple=info,warn"),
            1 => EnvFilter::new("tile_ripple=debug,info"),
            2 => EnvFilter::new("tile_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates inputs and shows what would be crawled
fn handle_dry_run(config: &Config, roots: &[String]) -> anyhow::Result<()> {
    let roots = parse_roots(roots)?;

    println!("=== Tile-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Traversal: {}", config.crawler.traversal);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Base delay: {}ms", config.retry.base_delay_ms);
    println!("  Max delay: {}ms", config.retry.max_delay_ms);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Database: {}", config.output.database_path().display());

    println!("\nRoots ({}):", roots.len());
    for root in &roots {
        println!("  - {}", root);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use tile_ripple::output::{load_statistics, print_statistics};
    use tile_ripple::storage::SqliteStorage;

    let path = config.output.database_path();
    anyhow::ensure!(path.exists(), "no crawl database at {}", path.display());
    println!("Database: {}\n", path.display());

    let storage = SqliteStorage::new(&path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, roots: &[String]) -> anyhow::Result<()> {
    tracing::info!(
        "Mirroring {} root(s) into {}",
        roots.len(),
        config.output.directory.display()
    );

    match run_crawl(config, roots).await {
        Ok(summary) => {
            if summary.has_failures() {
                tracing::warn!(
                    "{} failure(s) recorded, {} dispatched unit(s) incomplete; rerun to retry pending records",
                    summary.progress.failed,
                    summary.failed
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
