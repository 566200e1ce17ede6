//! Remote market data service

use crate::{Candle, Interval, Symbol};
use async_trait::async_trait;

pub mod binance_config;
pub mod binance_http;
pub mod binance_parser;
pub mod binance_spot;
pub mod pagination;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Contract of the remote market data service consumed by the scheduler
///
/// Timestamps are Unix milliseconds. Implementations must be shareable across the
/// concurrent workers of a batch.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Cheap connectivity and authentication check
    async fn ping(&self) -> FetcherResult<()>;

    /// List every symbol in the exchange universe
    async fn list_symbols(&self) -> FetcherResult<Vec<Symbol>>;

    /// Open time of the stream's most recent kline
    async fn latest_timestamp(&self, symbol: &Symbol, interval: Interval) -> FetcherResult<i64>;

    /// Open time of the stream's first ever kline
    async fn earliest_valid_timestamp(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> FetcherResult<i64>;

    /// Fetch all klines with open time in `[start_time, end_time]`
    ///
    /// Pagination is internal: one call may issue many physical requests of at most
    /// `page_limit` klines each.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start_time: i64,
        end_time: i64,
        page_limit: usize,
    ) -> FetcherResult<Vec<Candle>>;
}
