use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use word_search::config::Config;
use word_search::search::{ScanDriver, Searcher};
use word_search::telemetry;
use word_search::web;

/// Word Search Server - index a directory and look up words over HTTP
#[derive(Parser, Debug)]
#[command(name = "word_search")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP listen address, e.g. localhost:3333 (overrides config file)
    #[arg(short, long, value_name = "ADDR")]
    addr: Option<String>,

    /// Directory to scan (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    path: Option<String>,

    /// Time between rescans, e.g. "1h" or "90s" (overrides config file)
    #[arg(short, long, value_name = "DURATION")]
    interval: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Generate a template configuration file and exit
    #[arg(long, value_name = "FILE")]
    init: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(log_level)?;

    // Handle --init flag: generate template config and exit
    if let Some(init_path) = args.init {
        if init_path.exists() {
            anyhow::bail!(
                "Config file already exists: {}\nRemove it first or choose a different path.",
                init_path.display()
            );
        }

        Config::write_template(&init_path)?;
        println!("✓ Generated config file: {}", init_path.display());
        println!("\nEdit the file, then start the server with:");
        println!("  cargo run --release -- --config {}", init_path.display());
        return Ok(());
    }

    let config = load_config(&args)?;
    let interval = config.scanner.rescan_interval()?;

    info!(
        address = %config.server.address,
        path = %config.scanner.path,
        interval = %humantime::format_duration(interval),
        workers = config.scanner.workers,
        queue_capacity = config.scanner.queue_capacity,
        "Configuration loaded"
    );

    let searcher = Arc::new(Searcher::new(
        config.scanner.path.clone(),
        config.scanner.pool_config(),
    ));

    // Queries are only accepted once the initial scan has finished.
    let driver = ScanDriver::spawn(searcher.clone(), interval)?;
    let driver = tokio::task::spawn_blocking(move || driver.wait_ready().map(|()| driver))
        .await
        .context("Initial scan task failed")??;
    info!(stats = ?searcher.stats(), "Initial scan complete");

    let router = web::create_router(searcher);
    let listener = tokio::net::TcpListener::bind(&config.server.address)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", config.server.address))?;
    info!(address = %config.server.address, "Ready to accept connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server closed, stopping scan driver");
    tokio::task::spawn_blocking(move || driver.shutdown())
        .await
        .context("Scan driver shutdown failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let base_config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found: {}\nUse --init {} to generate a template.",
                config_path.display(),
                config_path.display()
            );
        }
        info!(path = %config_path.display(), "Loading config from file");
        Config::from_file(config_path)?
    } else {
        match Config::from_default_locations()? {
            Some((config, path)) => {
                info!(path = %path.display(), "Loading config from default location");
                config
            }
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    };

    Ok(base_config.with_overrides(
        args.addr.clone(),
        args.path.clone(),
        args.interval.clone(),
    ))
}
