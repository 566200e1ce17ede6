//! Cost estimation
//!
//! Turns "how far behind is this symbol" into "how many requests will bringing it
//! current take". One request returns at most [`PAGE_LIMIT`] klines, and at least
//! one request is always needed.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::downloader::config::PAGE_LIMIT;
use crate::fetcher::{FetcherResult, MarketData};
use crate::store::SeriesStore;
use crate::{Interval, Symbol, ONE_DAY_MS};

/// Estimated request count for fetching `[start_time, server_now]`
///
/// Returns 0 when the gap is shorter than one full day: such a symbol is not
/// worth a round trip this run.
pub fn estimate_cost(start_time: i64, server_now: i64, interval: Interval) -> u32 {
    let gap = server_now - start_time;
    if gap < ONE_DAY_MS {
        return 0;
    }

    let klines = gap / interval.to_milliseconds();
    let requests = 1 + klines / PAGE_LIMIT as i64;
    u32::try_from(requests).unwrap_or(u32::MAX)
}

/// Probes the store and the remote service to estimate each symbol's cost
pub struct CostEstimator {
    market: Arc<dyn MarketData>,
    store: Arc<dyn SeriesStore>,
    interval: Interval,
}

impl CostEstimator {
    /// Create an estimator
    pub fn new(
        market: Arc<dyn MarketData>,
        store: Arc<dyn SeriesStore>,
        interval: Interval,
    ) -> Self {
        Self {
            market,
            store,
            interval,
        }
    }

    /// Estimate the request cost of bringing `symbol` up to date
    ///
    /// Issues the latest-timestamp probe, plus the earliest-valid-timestamp probe
    /// when nothing is stored locally. An unreadable local series counts as empty.
    pub async fn estimate(&self, symbol: &Symbol) -> FetcherResult<u32> {
        let last_known = match self.store.last_timestamp(symbol) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Unreadable local series, treating as empty");
                None
            }
        };

        let server_now = self.market.latest_timestamp(symbol, self.interval).await?;
        let start = match last_known {
            Some(ts) => ts,
            None => {
                self.market
                    .earliest_valid_timestamp(symbol, self.interval)
                    .await?
            }
        };

        let cost = estimate_cost(start, server_now, self.interval);
        debug!(
            symbol = %symbol,
            start = start,
            server_now = server_now,
            cost = cost,
            "Estimated request cost"
        );
        Ok(cost)
    }
}
