//! Binance spot implementation of [`MarketData`]

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::binance_config::{BinanceMarketConfig, SPOT_CONFIG};
use super::binance_http::BinanceHttpClient;
use super::binance_parser::BinanceParser;
use super::pagination::PaginationHelper;
use super::shared_resources::{global_binance_rate_limiter, global_http_client};
use super::{FetcherError, FetcherResult, MarketData};
use crate::config::Credentials;
use crate::{Candle, Interval, Symbol};

/// Fetcher for the Binance spot REST API
pub struct BinanceSpotFetcher {
    http_client: BinanceHttpClient,
    config: &'static BinanceMarketConfig,
}

impl BinanceSpotFetcher {
    /// Create a fetcher on the shared HTTP client and weight limiter
    pub fn new(credentials: &Credentials, max_retries: u32) -> FetcherResult<Self> {
        Self::new_with_base_url(credentials, SPOT_CONFIG.base_url, max_retries)
    }

    /// Create with custom base URL (for testing)
    pub fn new_with_base_url(
        credentials: &Credentials,
        base_url: impl Into<String>,
        max_retries: u32,
    ) -> FetcherResult<Self> {
        let client = global_http_client().map_err(FetcherError::HttpError)?;
        let http_client = BinanceHttpClient::new(
            client,
            base_url,
            global_binance_rate_limiter(),
            max_retries,
        )
        .with_api_key(credentials.api_key.clone());

        Ok(Self {
            http_client,
            config: &SPOT_CONFIG,
        })
    }

    /// Fetch one klines page
    async fn fetch_klines_page(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start_time: Option<i64>,
        end_time: Option<i64>,
        limit: usize,
    ) -> FetcherResult<Vec<Value>> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = end_time {
            params.push(("endTime", end.to_string()));
        }

        self.http_client
            .get(self.config.klines_endpoint, &params, self.config.klines_weight)
            .await
    }
}

#[async_trait]
impl MarketData for BinanceSpotFetcher {
    async fn ping(&self) -> FetcherResult<()> {
        let _: Value = self
            .http_client
            .get(self.config.ping_endpoint, &[], self.config.ping_weight)
            .await?;
        debug!("Ping succeeded");
        Ok(())
    }

    async fn list_symbols(&self) -> FetcherResult<Vec<Symbol>> {
        info!("Fetching symbol universe from API");

        let tickers: Vec<Value> = self
            .http_client
            .get(
                self.config.ticker_price_endpoint,
                &[],
                self.config.ticker_price_weight,
            )
            .await?;

        let symbols = BinanceParser::parse_ticker_symbols(tickers)?;
        info!(symbols = symbols.len(), "Discovered symbols");
        Ok(symbols)
    }

    async fn latest_timestamp(&self, symbol: &Symbol, interval: Interval) -> FetcherResult<i64> {
        let klines = self
            .fetch_klines_page(symbol, interval, None, None, 1)
            .await?;
        BinanceParser::first_open_time(&klines)
    }

    async fn earliest_valid_timestamp(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> FetcherResult<i64> {
        let klines = self
            .fetch_klines_page(symbol, interval, Some(0), None, 1)
            .await?;
        BinanceParser::first_open_time(&klines)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start_time: i64,
        end_time: i64,
        page_limit: usize,
    ) -> FetcherResult<Vec<Candle>> {
        PaginationHelper::paginate_klines(
            symbol.as_str(),
            start_time,
            end_time,
            page_limit,
            |page_start| async move {
                let klines = self
                    .fetch_klines_page(
                        symbol,
                        interval,
                        Some(page_start),
                        Some(end_time),
                        page_limit,
                    )
                    .await?;
                BinanceParser::parse_klines(klines)
            },
        )
        .await
    }
}
