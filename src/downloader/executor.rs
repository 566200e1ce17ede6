//! Batch executor
//!
//! Runs one worker per batch member concurrently and waits for all of them. A
//! worker brings a single symbol's series up to date in memory; it never touches
//! the store for writing, so a failed sibling cannot leave a half-written file.

use crate::downloader::planner::Batch;
use crate::downloader::SymbolError;
use crate::fetcher::MarketData;
use crate::metrics::SymbolSyncMetrics;
use crate::store::SeriesStore;
use crate::{format_timestamp, Interval, Series, Symbol};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one worker
#[derive(Debug)]
pub struct SymbolOutcome {
    /// Symbol the worker handled
    pub symbol: Symbol,
    /// Merged series, or why the symbol could not be updated
    pub result: Result<Series, SymbolError>,
    /// Candles appended to the stored series
    pub appended: usize,
}

impl SymbolOutcome {
    /// Whether the worker produced a series to persist
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Concurrent fetcher for one batch at a time
#[derive(Clone)]
pub struct BatchExecutor {
    market: Arc<dyn MarketData>,
    store: Arc<dyn SeriesStore>,
    interval: Interval,
    page_limit: usize,
}

impl BatchExecutor {
    /// Create an executor
    pub fn new(
        market: Arc<dyn MarketData>,
        store: Arc<dyn SeriesStore>,
        interval: Interval,
        page_limit: usize,
    ) -> Self {
        Self {
            market,
            store,
            interval,
            page_limit,
        }
    }

    /// Fetch every member of `batch` concurrently
    ///
    /// Returns once all workers have finished, with outcomes in batch order. A
    /// worker that panics is reported as that symbol's failure.
    pub async fn execute(&self, batch: &Batch) -> Vec<SymbolOutcome> {
        let handles: Vec<_> = batch
            .symbols()
            .map(|symbol| {
                let worker = self.clone();
                let symbol = symbol.clone();
                tokio::spawn(async move { worker.sync_symbol(&symbol).await })
            })
            .collect();

        let joined = join_all(handles).await;

        batch
            .symbols()
            .zip(joined)
            .map(|(symbol, joined)| {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => Err(SymbolError::Worker(e.to_string())),
                };
                let appended = match &result {
                    Ok((_, appended)) => *appended,
                    Err(_) => 0,
                };
                SymbolOutcome {
                    symbol: symbol.clone(),
                    result: result.map(|(series, _)| series),
                    appended,
                }
            })
            .collect()
    }

    /// Bring one symbol's series up to the server's latest kline
    async fn sync_symbol(&self, symbol: &Symbol) -> Result<(Series, usize), SymbolError> {
        let metrics = SymbolSyncMetrics::start(symbol.as_str());

        let result = self.fetch_and_merge(symbol).await;
        match &result {
            Ok((_, appended)) => metrics.record_success(*appended),
            Err(e) => metrics.record_failure(&e.to_string()),
        }
        result
    }

    async fn fetch_and_merge(&self, symbol: &Symbol) -> Result<(Series, usize), SymbolError> {
        let mut series = match self.store.load(symbol) {
            Ok(series) => series.unwrap_or_default(),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Unreadable local series, fetching from scratch");
                Series::new()
            }
        };

        let end = self
            .market
            .latest_timestamp(symbol, self.interval)
            .await
            .map_err(SymbolError::Fetch)?;

        let start = match series.last_timestamp() {
            Some(ts) => ts + 1,
            None => self
                .market
                .earliest_valid_timestamp(symbol, self.interval)
                .await
                .map_err(SymbolError::Fetch)?,
        };

        if start > end {
            debug!(symbol = %symbol, "Series already current");
            return Ok((series, 0));
        }

        info!(
            symbol = %symbol,
            klines = (end - start) / self.interval.to_milliseconds() + 1,
            from = %format_timestamp(start),
            to = %format_timestamp(end),
            "Downloading klines"
        );
        let fetched = self
            .market
            .fetch_history(symbol, self.interval, start, end, self.page_limit)
            .await
            .map_err(SymbolError::Fetch)?;

        let fetched_count = fetched.len();
        let appended = series.extend_from(fetched, self.interval);
        debug!(
            symbol = %symbol,
            start = start,
            end = end,
            fetched = fetched_count,
            appended = appended,
            "Fetched history"
        );

        Ok((series, appended))
    }
}
