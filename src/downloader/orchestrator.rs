//! Run orchestration
//!
//! Walks the symbol universe once: estimate, plan, and whenever the planner
//! closes a batch, execute it, persist the results and pace. The trailing batch
//! is drained at the end without pacing.

use crate::config::RunConfig;
use crate::downloader::estimate::CostEstimator;
use crate::downloader::executor::{BatchExecutor, SymbolOutcome};
use crate::downloader::pacer::Pacer;
use crate::downloader::planner::{Batch, BatchPlanner};
use crate::downloader::{RunError, SymbolError};
use crate::fetcher::MarketData;
use crate::metrics;
use crate::store::SeriesStore;
use crate::Symbol;
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument};

/// Phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Estimating symbols and filling the current batch
    Collecting,
    /// Executing, persisting and pacing a closed batch
    Draining,
    /// Executing the trailing batch
    FinalFlush,
    /// Universe exhausted
    Completed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Collecting => "collecting",
            RunState::Draining => "draining",
            RunState::FinalFlush => "final_flush",
            RunState::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A symbol the run could not bring up to date
#[derive(Debug, Clone, Serialize)]
pub struct SymbolFailure {
    /// Symbol that failed
    pub symbol: Symbol,
    /// Error description
    pub error: String,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Symbols in the exchange universe
    pub symbols_listed: usize,
    /// Symbols with less than a day of missing data
    pub symbols_skipped: usize,
    /// Symbols whose estimate or fetch failed
    pub symbols_failed: usize,
    /// Symbols whose series was written back
    pub symbols_saved: usize,
    /// Batches executed
    pub batches: usize,
    /// Candles appended across all saved series
    pub candles_written: usize,
    /// Per-symbol failures in encounter order
    pub failures: Vec<SymbolFailure>,
    /// Final state
    pub state: RunState,
}

impl RunReport {
    fn new(symbols_listed: usize) -> Self {
        Self {
            symbols_listed,
            symbols_skipped: 0,
            symbols_failed: 0,
            symbols_saved: 0,
            batches: 0,
            candles_written: 0,
            failures: Vec::new(),
            state: RunState::Collecting,
        }
    }

    fn record_failure(&mut self, symbol: Symbol, error: &SymbolError) {
        self.symbols_failed += 1;
        self.failures.push(SymbolFailure {
            symbol,
            error: error.to_string(),
        });
    }
}

/// Drives one run over the whole universe
pub struct Orchestrator {
    config: RunConfig,
    market: Arc<dyn MarketData>,
    store: Arc<dyn SeriesStore>,
    progress: ProgressBar,
    state: RunState,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(config: RunConfig, market: Arc<dyn MarketData>, store: Arc<dyn SeriesStore>) -> Self {
        Self {
            config,
            market,
            store,
            progress: ProgressBar::hidden(),
            state: RunState::Collecting,
        }
    }

    /// Show progress over the universe on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run to completion
    ///
    /// Per-symbol failures are collected in the report. Connectivity, listing and
    /// store write failures abort the run.
    pub async fn run(mut self) -> Result<RunReport, RunError> {
        let universe = self.prepare().await?;
        let mut report = RunReport::new(universe.len());

        let estimator = CostEstimator::new(
            self.market.clone(),
            self.store.clone(),
            self.config.interval,
        );
        let executor = BatchExecutor::new(
            self.market.clone(),
            self.store.clone(),
            self.config.interval,
            self.config.page_limit,
        );
        let pacer = Pacer::new(self.config.pacing_window);
        let mut planner = BatchPlanner::new(self.config.weight_ceiling);

        self.transition(RunState::Collecting);
        for symbol in universe {
            let cost = estimator.estimate(&symbol).await;
            planner.charge_overhead(self.config.probe_weight);
            self.progress.inc(1);

            let cost = match cost {
                Ok(cost) => cost,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Estimate failed, skipping symbol this run");
                    metrics::record_symbol_skipped("estimate_failed");
                    report.record_failure(symbol, &SymbolError::Estimate(e));
                    continue;
                }
            };

            if cost == 0 {
                metrics::record_symbol_skipped("up_to_date");
                report.symbols_skipped += 1;
                continue;
            }

            if let Some(batch) = planner.push(symbol, cost) {
                self.transition(RunState::Draining);
                let started = Instant::now();
                self.drain(&executor, &batch, &mut report).await?;
                let slept = pacer.pace(started, Instant::now()).await;
                metrics::record_pacer_sleep(slept);
                self.transition(RunState::Collecting);
            }
        }

        self.transition(RunState::FinalFlush);
        if let Some(batch) = planner.finish() {
            self.drain(&executor, &batch, &mut report).await?;
        }

        self.transition(RunState::Completed);
        self.progress.finish_and_clear();
        report.state = self.state;

        info!(
            listed = report.symbols_listed,
            saved = report.symbols_saved,
            skipped = report.symbols_skipped,
            failed = report.symbols_failed,
            batches = report.batches,
            candles = report.candles_written,
            "Run completed"
        );
        Ok(report)
    }

    /// Estimate the whole universe and return the batches a run would execute
    ///
    /// Nothing is fetched beyond the estimation probes and nothing is written.
    pub async fn plan(self) -> Result<Vec<Batch>, RunError> {
        let universe = self.prepare().await?;
        let estimator = CostEstimator::new(
            self.market.clone(),
            self.store.clone(),
            self.config.interval,
        );
        let mut planner = BatchPlanner::new(self.config.weight_ceiling);
        let mut batches = Vec::new();

        for symbol in universe {
            let cost = estimator.estimate(&symbol).await;
            planner.charge_overhead(self.config.probe_weight);
            self.progress.inc(1);

            match cost {
                Ok(cost) => batches.extend(planner.push(symbol, cost)),
                Err(e) => warn!(symbol = %symbol, error = %e, "Estimate failed, leaving symbol out of plan"),
            }
        }
        batches.extend(planner.finish());

        self.progress.finish_and_clear();
        info!(batches = batches.len(), "Plan ready");
        Ok(batches)
    }

    /// Check connectivity and list the universe
    async fn prepare(&self) -> Result<Vec<Symbol>, RunError> {
        self.config.validate()?;

        self.market.ping().await.map_err(RunError::Connectivity)?;
        let universe = self.market.list_symbols().await.map_err(RunError::Listing)?;

        info!(
            symbols = universe.len(),
            interval = %self.config.interval,
            ceiling = self.config.weight_ceiling,
            "Listed symbol universe"
        );
        self.progress.set_length(universe.len() as u64);
        Ok(universe)
    }

    /// Execute one batch and persist every success
    async fn drain(
        &self,
        executor: &BatchExecutor,
        batch: &Batch,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        report.batches += 1;
        let span = tracing::info_span!(
            "drain_batch",
            batch = report.batches,
            symbols = batch.len(),
            weight = batch.total_cost()
        );

        async {
            info!("Executing batch");
            let outcomes = executor.execute(batch).await;
            metrics::record_batch(batch.len(), batch.total_cost());

            for SymbolOutcome {
                symbol,
                result,
                appended,
            } in outcomes
            {
                match result {
                    Ok(series) => {
                        self.store.save(&symbol, &series).map_err(|source| {
                            error!(symbol = %symbol, error = %source, "Failed to persist series");
                            RunError::StoreWrite {
                                symbol: symbol.clone(),
                                source,
                            }
                        })?;
                        report.symbols_saved += 1;
                        report.candles_written += appended;
                        info!(symbol = %symbol, appended = appended, total = series.len(), "Symbol updated");
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Symbol failed, will retry next run");
                        report.record_failure(symbol, &e);
                    }
                }
            }
            Ok::<(), RunError>(())
        }
        .instrument(span)
        .await
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Run state changed");
            self.state = next;
        }
    }
}
