//! catalog-crawler - Concurrent catalog crawler with CSV export

use anyhow::Result;
use catalog_crawler::commands::HarvestCommand;
use catalog_crawler::config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-crawler",
    version,
    about = "Concurrent catalog crawler with CSV export",
    long_about = "Fetches every page of the catalog listing in parallel and writes items stocked in the target regions to a CSV file."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Catalog listing endpoint
    #[arg(long, env = "CATALOG_BASE_URL")]
    base_url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, env = "CATALOG_PROXY")]
    proxy: Option<String>,

    /// Maximum pages fetched at once (unbounded by default)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Attempts per page before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = Some(concurrency);
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    let output = config.output.clone();
    let mut cmd = HarvestCommand::new(config);

    match cmd.execute().await {
        Ok(report) => {
            println!(
                "{} products were found, {} written to {}",
                report.total,
                report.rows_written,
                output.display()
            );
            if !report.is_complete() {
                println!("{} pages could not be fetched", report.failed.len());
            }
            println!(
                "The program's working time is {:.3} seconds",
                started.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    }
}
