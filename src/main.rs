//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest article archiver.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sumi_harvest::config::{load_config_with_hash, Config, SourceKind};
use sumi_harvest::crawler::{fetcher_from_config, Coordinator, RunOutcome};
use sumi_harvest::frontier::{entries_from_list, FrontierBuilder, FrontierEntry};
use sumi_harvest::output::{load_statistics, print_run_report, print_statistics};
use sumi_harvest::progress::{load_url_list, write_url_list, ProgressSnapshot};
use sumi_harvest::HarvestError;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_NO_URLS: u8 = 2;
const EXIT_SESSION_EXPIRED: u8 = 3;
const EXIT_CANCELLED: u8 = 130;

/// Sumi-Harvest: a resumable article archiver
///
/// Sumi-Harvest discovers every article a site lists, fetches each one
/// politely with retry and backoff, and archives it as markdown. Progress is
/// logged so an interrupted harvest resumes without repeating work.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable article archiver", long_about = None)]
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

    /// Discover URLs, write the URL list, and exit without fetching
    #[arg(long, conflicts_with = "from_list")]
    discover_only: bool,

    /// Skip discovery and harvest the URLs in the existing URL list
    #[arg(long)]
    from_list: bool,

    /// Re-fetch URLs that earlier runs already archived
    #[arg(long)]
    full: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "discover_only", "from_list"])]
    dry_run: bool,

    /// Show statistics from the progress log and exit
    #[arg(long, conflicts_with_all = ["dry_run", "discover_only", "from_list"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let fetcher = fetcher_from_config(&config).context("Failed to build HTTP client")?;

    let frontier = if cli.from_list {
        let path = config.output.url_list_path();
        let urls = load_url_list(&path)
            .with_context(|| format!("Failed to read URL list {}", path.display()))?;
        tracing::info!("Loaded {} URL(s) from {}", urls.len(), path.display());
        entries_from_list(urls)
    } else {
        let builder = FrontierBuilder::new(&config, fetcher.clone())?;
        match builder.build(&config.sources).await {
            Ok(entries) => {
                write_frontier(&config, &entries)?;
                entries
            }
            Err(HarvestError::NoUrlsFound) => return Ok(ExitCode::from(EXIT_NO_URLS)),
            Err(e) => return Err(e.into()),
        }
    };

    if frontier.is_empty() {
        tracing::error!("No URLs to harvest");
        return Ok(ExitCode::from(EXIT_NO_URLS));
    }

    if cli.discover_only {
        println!(
            "Discovered {} URL(s); list written to {}",
            frontier.len(),
            config.output.url_list_path().display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let diff_mode = config.harvest.diff_mode && !cli.full;
    let coordinator = Coordinator::from_config(&config, fetcher)?.with_diff_mode(diff_mode);

    // First Ctrl-C stops after in-flight URLs are recorded; a second exits now
    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Stop requested, finishing in-flight URLs (Ctrl-C again to exit now)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(EXIT_CANCELLED.into());
            }
        }
    });

    let report = coordinator.run(&frontier).await?;
    print_run_report(&report);

    Ok(match report.outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::SessionExpired { .. } => ExitCode::from(EXIT_SESSION_EXPIRED),
        RunOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

fn write_frontier(config: &Config, entries: &[FrontierEntry]) -> anyhow::Result<()> {
    let path = config.output.url_list_path();
    let written = write_url_list(&path, entries.iter().map(|entry| &entry.url))
        .with_context(|| format!("Failed to write URL list {}", path.display()))?;
    tracing::info!("Wrote {} URL(s) to {}", written, path.display());
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    let harvest = &config.harvest;
    println!("Harvest Configuration:");
    println!("  Base delay: {}ms", harvest.base_delay);
    println!("  Max retries: {}", harvest.max_retries);
    println!("  Backoff multiplier: {}", harvest.backoff_multiplier);
    println!("  Batch size: {}", harvest.batch_size);
    println!("  Batch delay: {}ms", harvest.batch_delay);
    println!("  Save interval: {}", harvest.save_interval);
    println!("  Diff mode: {}", harvest.diff_mode);
    println!("  Workers: {}", harvest.workers);
    println!("  Min content length: {}", harvest.min_content_length);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  URL list: {}", config.output.url_list_path().display());
    println!("  Progress log: {}", config.output.progress_path().display());
    println!("  Capture log: {}", config.output.capture_log_path().display());
    println!("  Archive: {}", config.output.archive_dir.display());

    match &config.session {
        Some(session) => {
            println!("\nSession:");
            println!("  Probe: {} (marker '{}')", session.probe_url, session.marker_selector);
            if let Some(cookies) = &session.cookie_file {
                println!("  Cookies: {}", cookies.display());
            }
        }
        None => println!("\nSession: none (always valid)"),
    }

    println!("\nArticle hosts: {}", config.discovery.article_hosts.join(", "));
    println!("Article prefixes: {}", config.discovery.article_prefixes.join(", "));

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        let kind = match source.kind {
            SourceKind::Listing => "listing",
            SourceKind::Category => "category",
        };
        println!("  - {} [{}] {}", source.name, kind, source.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes the progress log
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.output.progress_path();
    println!("Progress log: {}\n", path.display());

    let snapshot = ProgressSnapshot::read(&path)
        .with_context(|| format!("Failed to read progress log {}", path.display()))?;
    print_statistics(&load_statistics(&snapshot));

    Ok(())
}
