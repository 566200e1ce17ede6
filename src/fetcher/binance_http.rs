//! Binance HTTP client helper
//!
//! Every request goes through the shared weight limiter first, carries the API key
//! header, and is retried with exponential backoff on network errors, 5xx and 429.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::downloader::config::{calculate_backoff, REMOTE_WEIGHT_LIMIT};
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::{
    record_api_weight, record_retry_backoff, HttpRequestMetrics, RateLimiterMetrics,
};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Header reporting weight used in the current minute
pub const USED_WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Unified HTTP client for all Binance API interactions
pub struct BinanceHttpClient {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter>,
    max_retries: u32,
}

impl BinanceHttpClient {
    /// Create new HTTP client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - Base URL for API endpoints (e.g., "<https://api.binance.com>")
    /// * `rate_limiter` - Shared weight limiter
    /// * `max_retries` - Retries after the first attempt
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        rate_limiter: Arc<RateLimiter>,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            rate_limiter,
            max_retries,
        }
    }

    /// Send the given API key with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured retry count
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute GET request with generic deserialization
    ///
    /// # Arguments
    /// * `endpoint` - API endpoint path (e.g., "/api/v3/klines")
    /// * `params` - Query parameters as key-value pairs
    /// * `weight` - Weight charged against the shared limiter
    pub async fn get<T>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        weight: u32,
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut limiter_metrics = RateLimiterMetrics::new();
        limiter_metrics.start_acquire();
        self.rate_limiter
            .acquire(weight as usize)
            .await
            .map_err(|e| FetcherError::NetworkError(format!("Rate limiter error: {e}")))?;
        limiter_metrics.record_acquired(weight);
        limiter_metrics.update_available_permits(self.rate_limiter.available());

        debug!("Making GET request to: {} with {} params", url, params.len());

        self.request_with_retry(endpoint, &url, params).await
    }

    /// Retries on network errors, 5xx and 429; never on other 4xx
    async fn request_with_retry<T>(
        &self,
        endpoint: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let request_metrics = HttpRequestMetrics::start(endpoint, attempt + 1);

            let mut request = self.client.get(url).query(params);
            if let Some(key) = &self.api_key {
                request = request.header(API_KEY_HEADER, key);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    request_metrics.record_network_error();
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_error = Some(FetcherError::NetworkError(e.to_string()));
                    if attempt < self.max_retries {
                        self.backoff(attempt).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            request_metrics.record_complete(status.as_u16());

            if status.as_u16() == 429 || status.as_u16() == 418 {
                warn!(
                    "Rate limit error ({}) on attempt {}/{}",
                    status,
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(FetcherError::RateLimitExceeded);
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            if status.is_server_error() {
                warn!(
                    "Server error {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(FetcherError::HttpError(format!("Server error: {status}")));
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            if status.is_client_error() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(FetcherError::ApiError(format!(
                    "Client error {status}: {error_text}"
                )));
            }

            if let Some(weight) = parse_weight_header(response.headers()) {
                record_api_weight(weight, REMOTE_WEIGHT_LIMIT);
            }

            return response.json::<T>().await.map_err(|e| {
                FetcherError::ParseError(format!("Failed to deserialize response: {e}"))
            });
        }

        Err(last_error
            .unwrap_or_else(|| FetcherError::NetworkError("All retries exhausted".to_string())))
    }

    async fn backoff(&self, attempt: u32) {
        let backoff = calculate_backoff(attempt);
        record_retry_backoff(backoff, attempt + 1);
        debug!("Retrying after {:?}", backoff);
        tokio::time::sleep(backoff).await;
    }
}

/// Extract the `X-MBX-USED-WEIGHT-1M` header
///
/// Returns `None` when the header is missing or not a number.
pub fn parse_weight_header(headers: &reqwest::header::HeaderMap) -> Option<u32> {
    let weight_str = headers.get(USED_WEIGHT_HEADER)?.to_str().ok()?;

    match weight_str.parse::<u32>() {
        Ok(weight) => Some(weight),
        Err(e) => {
            warn!("Failed to parse weight header '{}': {}", weight_str, e);
            None
        }
    }
}
