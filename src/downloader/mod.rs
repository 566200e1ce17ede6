//! Rate-budgeted batch scheduling
//!
//! This module turns the symbol universe into a sequence of paced, concurrent
//! batches whose estimated request weight stays under the exchange budget.
//!
//! # Overview
//!
//! 1. **Estimation**: [`estimate::CostEstimator`] converts each symbol's missing
//!    history into an expected request count
//! 2. **Planning**: [`planner::BatchPlanner`] packs symbols into batches under the
//!    weight ceiling
//! 3. **Execution**: [`executor::BatchExecutor`] fetches a batch concurrently
//! 4. **Pacing**: [`pacer::Pacer`] stretches every batch to one window
//! 5. **Orchestration**: [`orchestrator::Orchestrator`] ties it together and
//!    persists results between batches
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kline_harvester::config::{Credentials, RunConfig};
//! use kline_harvester::downloader::Orchestrator;
//! use kline_harvester::fetcher::binance_spot::BinanceSpotFetcher;
//! use kline_harvester::store::CsvSeriesStore;
//! use kline_harvester::Interval;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::from_env()?;
//! let config = RunConfig::new(Interval::FiveMinutes, "Binance");
//! let market = Arc::new(BinanceSpotFetcher::new(&credentials, 5)?);
//! let store = Arc::new(CsvSeriesStore::new(&config.data_dir, config.interval));
//!
//! let batches = Orchestrator::new(config, market, store).plan().await?;
//! println!("{} batches", batches.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-symbol problems never stop a run: they surface as [`SymbolError`] in the
//! run report and the symbol is picked up again by the next run. Only
//! [`RunError`] aborts.

pub mod config;
pub mod estimate;
pub mod executor;
pub mod orchestrator;
pub mod pacer;
pub mod planner;
pub mod rate_limit;

pub use estimate::{estimate_cost, CostEstimator};
pub use executor::{BatchExecutor, SymbolOutcome};
pub use orchestrator::{Orchestrator, RunReport, RunState, SymbolFailure};
pub use pacer::Pacer;
pub use planner::{Batch, BatchEntry, BatchPlanner};
pub use rate_limit::{RateLimitError, RateLimiter};

use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::store::StoreError;
use crate::Symbol;

/// Why a single symbol could not be brought up to date
#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    /// Cost estimation probe failed
    #[error("estimate failed: {0}")]
    Estimate(FetcherError),

    /// History fetch failed
    #[error("fetch failed: {0}")]
    Fetch(FetcherError),

    /// Worker task died
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration or credentials unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Remote service unreachable or rejected the credentials
    #[error("connectivity check failed: {0}")]
    Connectivity(FetcherError),

    /// Symbol universe could not be listed
    #[error("failed to list symbols: {0}")]
    Listing(FetcherError),

    /// Store directory is locked by another run
    #[error("store unavailable: {0}")]
    Lock(StoreError),

    /// A fetched series could not be persisted
    #[error("failed to save {symbol}: {source}")]
    StoreWrite {
        /// Symbol being saved
        symbol: Symbol,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}
