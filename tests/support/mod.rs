//! In-memory market data and store doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kline_harvester::fetcher::{FetcherError, FetcherResult, MarketData};
use kline_harvester::store::{SeriesStore, StoreError, StoreResult};
use kline_harvester::{Candle, Interval, Series, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const HOUR: i64 = 3_600_000;
pub const DAY: i64 = 24 * HOUR;

/// One symbol's server-side kline stream
#[derive(Debug, Clone, Copy)]
pub struct Stream {
    pub earliest: i64,
    pub latest: i64,
    pub fail_estimate: bool,
    pub fail_fetch: bool,
}

impl Stream {
    pub fn new(earliest: i64, latest: i64) -> Self {
        Self {
            earliest,
            latest,
            fail_estimate: false,
            fail_fetch: false,
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_estimate(mut self) -> Self {
        self.fail_estimate = true;
        self
    }
}

/// Scriptable exchange
#[derive(Default)]
pub struct FakeMarket {
    order: Vec<Symbol>,
    streams: Mutex<HashMap<String, Stream>>,
    ping_fails: AtomicBool,
    listing_fails: AtomicBool,
    fetches: Mutex<Vec<(Symbol, i64, i64, Instant)>>,
}

impl FakeMarket {
    pub fn new(streams: &[(&str, Stream)]) -> Arc<Self> {
        Arc::new(Self {
            order: streams.iter().map(|(s, _)| Symbol::new(*s)).collect(),
            streams: Mutex::new(
                streams
                    .iter()
                    .map(|(s, stream)| (s.to_string(), *stream))
                    .collect(),
            ),
            ..Default::default()
        })
    }

    pub fn set_latest(&self, symbol: &str, latest: i64) {
        if let Some(stream) = self.streams.lock().unwrap().get_mut(symbol) {
            stream.latest = latest;
        }
    }

    pub fn fail_ping(&self) {
        self.ping_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    /// `(symbol, start, end, when)` of every history fetch, in call order
    pub fn fetches(&self) -> Vec<(Symbol, i64, i64, Instant)> {
        self.fetches.lock().unwrap().clone()
    }

    fn stream(&self, symbol: &Symbol) -> FetcherResult<Stream> {
        self.streams
            .lock()
            .unwrap()
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| FetcherError::ApiError(format!("unknown symbol {symbol}")))
    }
}

pub fn candle(open_time: i64, interval: Interval) -> Candle {
    let price = Decimal::from_str("42.125").unwrap() + Decimal::from(open_time / HOUR);
    Candle {
        open_time,
        open: price,
        high: price + Decimal::ONE,
        low: price - Decimal::ONE,
        close: price,
        volume: Decimal::from_str("1.00000001").unwrap(),
        close_time: open_time + interval.to_milliseconds() - 1,
        quote_volume: Decimal::from_str("42.12500042").unwrap(),
        trades: 7,
        taker_buy_base_volume: Decimal::from_str("0.5").unwrap(),
        taker_buy_quote_volume: Decimal::from_str("21.0625").unwrap(),
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn ping(&self) -> FetcherResult<()> {
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(FetcherError::ApiError("Client error 401: invalid key".to_string()));
        }
        Ok(())
    }

    async fn list_symbols(&self) -> FetcherResult<Vec<Symbol>> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(FetcherError::HttpError("Server error: 503".to_string()));
        }
        Ok(self.order.clone())
    }

    async fn latest_timestamp(&self, symbol: &Symbol, _: Interval) -> FetcherResult<i64> {
        let stream = self.stream(symbol)?;
        if stream.fail_estimate {
            return Err(FetcherError::NetworkError("probe timed out".to_string()));
        }
        Ok(stream.latest)
    }

    async fn earliest_valid_timestamp(&self, symbol: &Symbol, _: Interval) -> FetcherResult<i64> {
        Ok(self.stream(symbol)?.earliest)
    }

    async fn fetch_history(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start_time: i64,
        end_time: i64,
        _page_limit: usize,
    ) -> FetcherResult<Vec<Candle>> {
        let stream = self.stream(symbol)?;
        self.fetches
            .lock()
            .unwrap()
            .push((symbol.clone(), start_time, end_time, Instant::now()));

        if stream.fail_fetch {
            return Err(FetcherError::NetworkError("connection reset".to_string()));
        }

        let step = interval.to_milliseconds();
        let mut open_time = stream.earliest;
        let mut candles = Vec::new();
        while open_time <= end_time.min(stream.latest) {
            if open_time >= start_time {
                candles.push(candle(open_time, interval));
            }
            open_time += step;
        }
        Ok(candles)
    }
}

/// Store wrapper whose writes always fail
pub struct ReadOnlyStore<S>(pub S);

impl<S: SeriesStore> SeriesStore for ReadOnlyStore<S> {
    fn load(&self, symbol: &Symbol) -> StoreResult<Option<Series>> {
        self.0.load(symbol)
    }

    fn save(&self, _symbol: &Symbol, _series: &Series) -> StoreResult<()> {
        Err(StoreError::IoError("disk full".to_string()))
    }
}
