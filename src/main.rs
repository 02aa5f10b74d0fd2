//! cep-harvest main entry point
//!
//! This is the command-line interface for the cep-harvest postal code crawler.

use cep_harvest::config::{load_config_with_hash, validate, Config};
use cep_harvest::crawler::{effective_delay, run_crawl};
use cep_harvest::output::{print_csv_check, print_report, read_postal_codes};
use cep_harvest::url::normalize_url;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status after a forced second interrupt (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// cep-harvest: a bounded-target postal code crawler
///
/// cep-harvest walks a neighborhood-listing site breadth-first, collecting
/// Brazilian postal codes (CEPs) until an exact target count is reached,
/// and writes them to a sorted single-column CSV.
#[derive(Parser, Debug)]
#[command(name = "cep-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-target postal code crawler", long_about = None)]
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

    /// Override the number of codes to collect
    #[arg(long, value_name = "N")]
    target: Option<usize>,

    /// Override the worker pool size (1 = sequential)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Override the crawl root
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Override the CSV output path
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show the crawl plan without crawling
    #[arg(long, conflicts_with = "check_csv")]
    dry_run: bool,

    /// Validate a previously written CSV and exit
    #[arg(long, value_name = "PATH", conflicts_with = "dry_run")]
    check_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.check_csv {
        return handle_check_csv(path);
    }

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let config = match apply_overrides(config, &cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid command-line override: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("cep_harvest=info,warn"),
            1 => EnvFilter::new("cep_harvest=debug,info"),
            2 => EnvFilter::new("cep_harvest=trace,debug"),
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

/// Applies command-line overrides and re-validates the result
fn apply_overrides(mut config: Config, cli: &Cli) -> Result<Config, cep_harvest::ConfigError> {
    if let Some(target) = cli.target {
        config.crawler.target = target;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(base_url) = &cli.base_url {
        config.crawler.base_url = base_url.clone();
    }
    if let Some(output) = &cli.output {
        config.output.csv_path = output.display().to_string();
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let crawler = &config.crawler;
    let root = normalize_url(&crawler.base_url)?;
    let delay = effective_delay(
        Duration::from_millis(crawler.request_delay_ms),
        crawler.workers,
        Duration::from_millis(crawler.min_parallel_delay_ms),
    );

    println!("=== cep-harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Crawl root: {}", root);
    println!("  Target: {} codes", crawler.target);
    println!(
        "  Workers: {} ({})",
        crawler.workers,
        if crawler.workers == 1 {
            "sequential"
        } else {
            "parallel"
        }
    );
    println!("  Timeout: {}s", crawler.timeout_secs);
    println!("  Delay after each page: {:?}", delay);
    println!(
        "  Region prefix: {}",
        crawler.region_prefix.as_deref().unwrap_or("(any)")
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nLink Classifier:");
    println!(
        "  Excluded sections: {}",
        config.classifier.excluded_sections.join(", ")
    );
    println!(
        "  Record segments: {}",
        config.classifier.record_segments.join(", ")
    );
    println!(
        "  Placeholder segments: {}",
        config.classifier.placeholder_segments.join(", ")
    );

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --check-csv mode: reads back a CSV and reports on its rows
fn handle_check_csv(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    match read_postal_codes(path) {
        Ok(check) => {
            print_csv_check(&check);
            Ok(())
        }
        Err(e) => {
            tracing::error!("CSV check failed: {}", e);
            Err(e.into())
        }
    }
}

/// Raises the stop flag; returns true if it was already raised
fn record_interrupt(stop: &AtomicBool) -> bool {
    stop.swap(true, Ordering::SeqCst)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));

    let signal_flag = Arc::clone(&stop);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if record_interrupt(&signal_flag) {
                tracing::error!("Second interrupt received; exiting without writing output");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
            tracing::warn!(
                "Interrupt received; finishing in-flight pages before writing output \
                 (press Ctrl-C again to exit immediately)"
            );
        }
    });

    match run_crawl(config, stop).await {
        Ok(report) => {
            tracing::info!("Crawl completed: {}", report.outcome);
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
