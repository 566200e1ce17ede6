//! Pagination helper for Binance klines
//!
//! Klines are paged by `startTime`: each page starts one millisecond after the
//! close time of the previous page's last kline. Pagination stops at the end of
//! the requested range, on an empty or short page, or when the iteration guard
//! trips.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::Candle;
use std::future::Future;
use tracing::debug;

/// Maximum number of pagination iterations to prevent infinite loops
const MAX_ITERATIONS: usize = 10_000;

/// Pagination helper for Binance API requests
pub struct PaginationHelper;

impl PaginationHelper {
    /// Collect every kline with open time in `[start_time, end_time]`
    ///
    /// # Arguments
    /// * `symbol` - Trading symbol, for diagnostics
    /// * `start_time` - First open time to include (ms)
    /// * `end_time` - Last open time to include (ms)
    /// * `page_limit` - Klines requested per page
    /// * `fetch_page` - Fetches one page starting at the given open time
    ///
    /// # Errors
    /// Returns the first page error, or an API error when the iteration guard trips
    /// or a page fails to advance the cursor
    pub async fn paginate_klines<F, Fut>(
        symbol: &str,
        start_time: i64,
        end_time: i64,
        page_limit: usize,
        mut fetch_page: F,
    ) -> FetcherResult<Vec<Candle>>
    where
        F: FnMut(i64) -> Fut,
        Fut: Future<Output = FetcherResult<Vec<Candle>>>,
    {
        let mut all_candles = Vec::new();
        let mut current_start = start_time;
        let mut iteration = 0;

        loop {
            if iteration >= MAX_ITERATIONS {
                return Err(FetcherError::ApiError(format!(
                    "Max iterations ({MAX_ITERATIONS}) exceeded for symbol {symbol} - possible infinite loop. Last timestamp: {current_start}"
                )));
            }

            if current_start > end_time {
                break;
            }

            debug!(
                "Fetching klines page {} for {} from {} to {}",
                iteration + 1,
                symbol,
                current_start,
                end_time
            );

            let page = fetch_page(current_start).await?;
            iteration += 1;

            let Some(last) = page.last() else {
                debug!("Empty page received at iteration {}", iteration);
                break;
            };

            let next_start = last.close_time + 1;
            if next_start <= current_start {
                return Err(FetcherError::ApiError(format!(
                    "Pagination for {symbol} did not advance past {current_start}"
                )));
            }

            let short_page = page.len() < page_limit;
            all_candles.extend(page.into_iter().filter(|c| c.open_time <= end_time));
            current_start = next_start;

            if short_page {
                break;
            }
        }

        debug!(
            "Pagination completed after {} iterations. Total klines: {}",
            iteration,
            all_candles.len()
        );

        Ok(all_candles)
    }
}
