//! Process-wide HTTP client and request-weight limiter
//!
//! Binance enforces its request budget per IP, so every fetcher in the process
//! must draw from the same limiter rather than building its own.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;

use crate::downloader::config::{REMOTE_WEIGHT_LIMIT, REMOTE_WEIGHT_WINDOW};
use crate::downloader::rate_limit::RateLimiter;

/// HTTP connect timeout (seconds)
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds), covers a full klines page
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

static GLOBAL_HTTP_CLIENT: Lazy<Result<Arc<Client>, String>> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(std::time::Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .map(Arc::new)
        .map_err(|e| format!("failed to build HTTP client: {e}"))
});

static GLOBAL_BINANCE_RATE_LIMITER: Lazy<Arc<RateLimiter>> = Lazy::new(|| {
    Arc::new(RateLimiter::weight_based(
        REMOTE_WEIGHT_LIMIT as usize,
        REMOTE_WEIGHT_WINDOW,
    ))
});

/// Get the global HTTP client
///
/// Fails only when the TLS backend cannot be initialised.
pub fn global_http_client() -> Result<Arc<Client>, String> {
    GLOBAL_HTTP_CLIENT.clone()
}

/// Get the global Binance request-weight limiter
pub fn global_binance_rate_limiter() -> Arc<RateLimiter> {
    GLOBAL_BINANCE_RATE_LIMITER.clone()
}
