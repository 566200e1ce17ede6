//! `sync` and `plan` commands

use crate::config::{Credentials, RunConfig};
use crate::downloader::config::WEIGHT_CEILING;
use crate::downloader::{Batch, Orchestrator, RunError, RunReport};
use crate::fetcher::binance_spot::BinanceSpotFetcher;
use crate::metrics;
use crate::store::{CsvSeriesStore, StoreLock};
use crate::Interval;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::CliError;

/// Kline Harvester CLI
#[derive(Parser, Debug)]
#[command(name = "kline-harvester")]
#[command(about = "Keep a local CSV copy of every Binance spot symbol's kline history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Directory holding one CSV file per symbol
    #[arg(long, global = true, default_value = "Binance")]
    pub data_dir: PathBuf,

    /// Kline interval (e.g., 1m, 5m, 1h, 1d)
    #[arg(long, global = true, default_value = "5m")]
    pub interval: Interval,

    /// Maximum estimated request weight per batch
    #[arg(long, global = true, default_value_t = WEIGHT_CEILING, value_parser = clap::value_parser!(u32).range(1..))]
    pub weight_ceiling: u32,

    /// Maximum number of retries for failed requests (default: 5, range: 1-20)
    #[arg(long, global = true, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Commands {
    /// Bring every symbol's local series up to date
    Sync,

    /// Estimate every symbol and print the batches a sync would run
    Plan,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    /// Run the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            metrics::init_metrics(addr)?;
        }

        let credentials = Credentials::from_env()?;
        let config = self.run_config();
        config.validate()?;

        match self.command {
            Commands::Sync => self.sync(config, &credentials).await,
            Commands::Plan => self.plan(config, &credentials).await,
        }
    }

    /// Run configuration from the global flags
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.interval, &self.data_dir).with_weight_ceiling(self.weight_ceiling)
    }

    async fn sync(&self, config: RunConfig, credentials: &Credentials) -> Result<(), CliError> {
        let mut lock = StoreLock::open(&config.data_dir).map_err(RunError::Lock)?;
        let lock_path = lock.path().display().to_string();
        let _guard = lock.try_exclusive().map_err(RunError::Lock)?;
        info!(lock = %lock_path, "Store directory locked");

        let market = Arc::new(BinanceSpotFetcher::new(credentials, self.max_retries)?);
        let store = Arc::new(CsvSeriesStore::new(&config.data_dir, config.interval));

        let report = Orchestrator::new(config, market, store)
            .with_progress(self.progress_bar("Estimating"))
            .run()
            .await?;

        match self.output_format {
            OutputFormat::Json => output_json(&report),
            OutputFormat::Human => {
                output_human(&report);
                Ok(())
            }
        }
    }

    async fn plan(&self, config: RunConfig, credentials: &Credentials) -> Result<(), CliError> {
        let ceiling = config.weight_ceiling;
        let market = Arc::new(BinanceSpotFetcher::new(credentials, self.max_retries)?);
        let store = Arc::new(CsvSeriesStore::new(&config.data_dir, config.interval));

        let batches = Orchestrator::new(config, market, store)
            .with_progress(self.progress_bar("Planning"))
            .plan()
            .await?;

        match self.output_format {
            OutputFormat::Json => output_plan_json(&batches, ceiling),
            OutputFormat::Human => {
                output_plan_human(&batches, ceiling);
                Ok(())
            }
        }
    }

    fn progress_bar(&self, message: &'static str) -> ProgressBar {
        if self.output_format == OutputFormat::Json {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(message);
        pb
    }
}

fn output_json(report: &RunReport) -> Result<(), CliError> {
    let rendered = serde_json::to_string(report)
        .map_err(|e| CliError::OutputError(format!("Failed to serialize report: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn output_human(report: &RunReport) {
    println!("\nSync completed!");
    println!("Symbols listed: {}", report.symbols_listed);
    println!("Symbols saved: {}", report.symbols_saved);
    println!("Symbols up to date: {}", report.symbols_skipped);
    println!("Batches: {}", report.batches);
    println!("Candles written: {}", report.candles_written);

    if !report.failures.is_empty() {
        println!("Failed ({}), retried next run:", report.symbols_failed);
        for failure in &report.failures {
            println!("  {}: {}", failure.symbol, failure.error);
        }
    }
}

fn output_plan_json(batches: &[Batch], ceiling: u32) -> Result<(), CliError> {
    let batches: Vec<_> = batches
        .iter()
        .enumerate()
        .map(|(i, batch)| {
            json!({
                "batch": i + 1,
                "weight": batch.total_cost(),
                "symbols": batch
                    .entries()
                    .iter()
                    .map(|e| json!({ "symbol": e.symbol, "cost": e.cost }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let output = json!({
        "ceiling": ceiling,
        "batch_count": batches.len(),
        "batches": batches,
    });
    let rendered = serde_json::to_string(&output)
        .map_err(|e| CliError::OutputError(format!("Failed to serialize plan: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn output_plan_human(batches: &[Batch], ceiling: u32) {
    let symbols: usize = batches.iter().map(Batch::len).sum();
    println!(
        "\n{} symbols in {} batches (ceiling {})",
        symbols,
        batches.len(),
        ceiling
    );

    for (i, batch) in batches.iter().enumerate() {
        println!(
            "\nBatch {} ({} symbols, weight {})",
            i + 1,
            batch.len(),
            batch.total_cost()
        );
        for entry in batch.entries() {
            println!("  {:<16} {:>6}", entry.symbol.as_str(), entry.cost);
        }
    }
}
