//! Binance spot market configuration
//!
//! Endpoint paths and the weight each request is charged against the
//! 1200-per-minute request budget.

/// Configuration for the Binance spot REST API
#[derive(Debug, Clone)]
pub struct BinanceMarketConfig {
    /// Base URL for API (e.g., <https://api.binance.com>)
    pub base_url: &'static str,

    /// Connectivity check endpoint path
    pub ping_endpoint: &'static str,

    /// All-symbol price ticker endpoint path, used as the symbol universe
    pub ticker_price_endpoint: &'static str,

    /// Klines endpoint path
    pub klines_endpoint: &'static str,

    /// Weight of a ping request
    pub ping_weight: u32,

    /// Weight of the all-symbol ticker request
    pub ticker_price_weight: u32,

    /// Weight of one klines page
    pub klines_weight: u32,
}

/// Binance spot configuration
///
/// Weights are counted in the same units as the batch ceiling: one unit per
/// klines page, two for the all-symbol ticker listing.
pub const SPOT_CONFIG: BinanceMarketConfig = BinanceMarketConfig {
    base_url: "https://api.binance.com",
    ping_endpoint: "/api/v3/ping",
    ticker_price_endpoint: "/api/v3/ticker/price",
    klines_endpoint: "/api/v3/klines",
    ping_weight: 1,
    ticker_price_weight: 2,
    klines_weight: 1,
};
