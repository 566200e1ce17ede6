//! # Kline Harvester Library
//!
//! Bulk-downloads historical candlestick ("kline") data for every tradable symbol
//! on an exchange while staying under the exchange's per-minute request-weight
//! budget. Each symbol's series is persisted to its own CSV file, so repeated runs
//! only fetch what is missing since the last stored candle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kline_harvester::config::{Credentials, RunConfig};
//! use kline_harvester::downloader::Orchestrator;
//! use kline_harvester::fetcher::binance_spot::BinanceSpotFetcher;
//! use kline_harvester::store::csv::CsvSeriesStore;
//! use kline_harvester::Interval;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::from_env()?;
//! let config = RunConfig::new(Interval::FiveMinutes, "Binance");
//!
//! let market = Arc::new(BinanceSpotFetcher::new(&credentials, 5)?);
//! let store = Arc::new(CsvSeriesStore::new(&config.data_dir, config.interval));
//!
//! let report = Orchestrator::new(config, market, store).run().await?;
//! println!("saved {} symbols", report.symbols_saved);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Remote market data service (symbol universe, probes, paginated history)
//! - [`store`] - Per-symbol series persistence
//! - [`downloader`] - The rate-budgeted batch scheduler: cost estimation, batch
//!   planning, concurrent execution, pacing and the orchestrating state machine
//! - [`config`] - Run configuration and credentials
//! - [`cli`] - Command line surface
//! - [`metrics`] - Prometheus metrics
//!
//! ## Data Types
//!
//! - [`Candle`] - One OHLCV kline with trade statistics
//! - [`Series`] - Time-ordered candles of one (symbol, interval)
//! - [`Symbol`] - Opaque identifier of one data stream
//! - [`Interval`] - Kline sampling granularity

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// CLI command implementations
pub mod cli;

/// Run configuration and credentials
pub mod config;

/// Rate-budgeted batch scheduler
pub mod downloader;

/// Remote market data service
pub mod fetcher;

/// Prometheus metrics
pub mod metrics;

/// Series persistence
pub mod store;

/// Milliseconds in one day
pub const ONE_DAY_MS: i64 = 86_400_000;

/// Render a Unix millisecond timestamp as RFC 3339 UTC for logs and reports
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

/// Identifier of one tradable instrument / data stream (e.g. "BTCUSDT")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from its exchange name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Exchange name of the symbol
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One fixed-interval OHLCV kline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Open time (Unix timestamp in milliseconds)
    pub open_time: i64,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Volume (base asset)
    pub volume: Decimal,
    /// Close time (Unix timestamp in milliseconds)
    pub close_time: i64,
    /// Quote asset volume
    pub quote_volume: Decimal,
    /// Number of trades
    pub trades: u64,
    /// Taker buy base asset volume
    pub taker_buy_base_volume: Decimal,
    /// Taker buy quote asset volume
    pub taker_buy_quote_volume: Decimal,
}

/// Time-ordered candles of one (symbol, interval)
///
/// Candles are ascending by `open_time` with no duplicates. New candles are only
/// ever appended after the current tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from candles already in ascending, duplicate-free order
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Candles in ascending order
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Number of candles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Whether the series holds no candles
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Open time of the last candle, if any
    pub fn last_timestamp(&self) -> Option<i64> {
        self.candles.last().map(|c| c.open_time)
    }

    /// Append freshly fetched candles after the current tail
    ///
    /// Candles at or before the stored tail are dropped so a merge never produces
    /// duplicate timestamps. A hole between the stored tail and the first new candle
    /// is reported but not repaired.
    ///
    /// # Returns
    /// Number of candles actually appended
    pub fn extend_from(&mut self, fetched: Vec<Candle>, interval: Interval) -> usize {
        let tail = self.last_timestamp();
        let before = self.candles.len();

        let mut fresh = fetched
            .into_iter()
            .filter(|c| tail.map_or(true, |t| c.open_time > t))
            .peekable();

        if let (Some(tail), Some(first)) = (tail, fresh.peek()) {
            let expected = tail + interval.to_milliseconds();
            if first.open_time != expected {
                warn!(
                    stored_tail = tail,
                    first_new = first.open_time,
                    expected = expected,
                    "Gap between stored series and fetched candles"
                );
            }
        }

        for candle in fresh {
            if let Some(last) = self.last_timestamp() {
                if candle.open_time <= last {
                    continue;
                }
            }
            self.candles.push(candle);
        }

        self.candles.len() - before
    }
}

/// Time interval for klines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    #[serde(rename = "1m")]
    OneMinute,
    /// 3 minutes
    #[serde(rename = "3m")]
    ThreeMinutes,
    /// 5 minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minutes
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 30 minutes
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// 1 hour
    #[serde(rename = "1h")]
    OneHour,
    /// 2 hours
    #[serde(rename = "2h")]
    TwoHours,
    /// 4 hours
    #[serde(rename = "4h")]
    FourHours,
    /// 6 hours
    #[serde(rename = "6h")]
    SixHours,
    /// 8 hours
    #[serde(rename = "8h")]
    EightHours,
    /// 12 hours
    #[serde(rename = "12h")]
    TwelveHours,
    /// 1 day
    #[serde(rename = "1d")]
    OneDay,
    /// 3 days
    #[serde(rename = "3d")]
    ThreeDays,
    /// 1 week
    #[serde(rename = "1w")]
    OneWeek,
    /// 1 month
    #[serde(rename = "1M")]
    OneMonth,
}

impl Interval {
    /// Convert interval to milliseconds
    pub fn to_milliseconds(&self) -> i64 {
        match self {
            Interval::OneMinute => 60_000,
            Interval::ThreeMinutes => 180_000,
            Interval::FiveMinutes => 300_000,
            Interval::FifteenMinutes => 900_000,
            Interval::ThirtyMinutes => 1_800_000,
            Interval::OneHour => 3_600_000,
            Interval::TwoHours => 7_200_000,
            Interval::FourHours => 14_400_000,
            Interval::SixHours => 21_600_000,
            Interval::EightHours => 28_800_000,
            Interval::TwelveHours => 43_200_000,
            Interval::OneDay => ONE_DAY_MS,
            Interval::ThreeDays => 259_200_000,
            Interval::OneWeek => 604_800_000,
            Interval::OneMonth => 2_592_000_000, // Approximate: 30 days
        }
    }

    /// Binance wire name ("5m", "1h", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "3m" => Ok(Interval::ThreeMinutes),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "1h" => Ok(Interval::OneHour),
            "2h" => Ok(Interval::TwoHours),
            "4h" => Ok(Interval::FourHours),
            "6h" => Ok(Interval::SixHours),
            "8h" => Ok(Interval::EightHours),
            "12h" => Ok(Interval::TwelveHours),
            "1d" => Ok(Interval::OneDay),
            "3d" => Ok(Interval::ThreeDays),
            "1w" => Ok(Interval::OneWeek),
            "1M" => Ok(Interval::OneMonth),
            _ => Err(format!("Invalid interval: {s}")),
        }
    }
}
