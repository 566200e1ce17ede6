//! Cost estimator probing against the in-memory exchange

use crate::support::{candle, FakeMarket, Stream, DAY, HOUR};
use kline_harvester::downloader::CostEstimator;
use kline_harvester::store::{CsvSeriesStore, SeriesStore};
use kline_harvester::{Interval, Series, Symbol};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_estimate_from_earliest_when_nothing_stored() {
    let temp_dir = TempDir::new().unwrap();
    let market = FakeMarket::new(&[("BTCUSDT", Stream::new(0, 2000 * HOUR))]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));
    let estimator = CostEstimator::new(market, store, Interval::OneHour);

    // 2000 hourly klines: two full pages
    assert_eq!(estimator.estimate(&Symbol::new("BTCUSDT")).await.unwrap(), 3);
}

#[tokio::test]
async fn test_estimate_from_stored_tail() {
    let temp_dir = TempDir::new().unwrap();
    let market = FakeMarket::new(&[("BTCUSDT", Stream::new(0, 2000 * HOUR))]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));
    let symbol = Symbol::new("BTCUSDT");
    store
        .save(
            &symbol,
            &Series::from_candles(vec![candle(1990 * HOUR, Interval::OneHour)]),
        )
        .unwrap();

    let estimator = CostEstimator::new(market.clone(), store.clone(), Interval::OneHour);
    assert_eq!(estimator.estimate(&symbol).await.unwrap(), 0);

    market.set_latest("BTCUSDT", 1990 * HOUR + DAY);
    assert_eq!(estimator.estimate(&symbol).await.unwrap(), 1);
}

#[tokio::test]
async fn test_corrupt_store_counts_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let market = FakeMarket::new(&[("BTCUSDT", Stream::new(0, 3 * DAY))]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));
    let symbol = Symbol::new("BTCUSDT");
    std::fs::write(store.path_for(&symbol), "not,a,series\n1,2\n").unwrap();

    let estimator = CostEstimator::new(market, store, Interval::OneHour);
    assert_eq!(estimator.estimate(&symbol).await.unwrap(), 1);
}

#[tokio::test]
async fn test_bad_decimal_with_recent_tail_counts_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let market = FakeMarket::new(&[("BTCUSDT", Stream::new(0, 3 * DAY))]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));
    let symbol = Symbol::new("BTCUSDT");
    let tail = 3 * DAY - 10 * HOUR;
    std::fs::write(
        store.path_for(&symbol),
        format!(
            "open_time,open,high,low,close,volume,close_time,quote_volume,trades,taker_buy_base_volume,taker_buy_quote_volume\n\
             0,abc,1,1,1,1,{},1,1,1,1\n\
             {tail},1,1,1,1,1,{},1,1,1,1\n",
            HOUR - 1,
            tail + HOUR - 1
        ),
    )
    .unwrap();
    assert!(store.load(&symbol).is_err());

    // Tail is only 10h behind, but the executor would refetch from the earliest kline
    let estimator = CostEstimator::new(market, store, Interval::OneHour);
    assert_eq!(estimator.estimate(&symbol).await.unwrap(), 1);
}

#[tokio::test]
async fn test_probe_failure_propagates() {
    let temp_dir = TempDir::new().unwrap();
    let market = FakeMarket::new(&[("BTCUSDT", Stream::new(0, 3 * DAY).failing_estimate())]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));

    let estimator = CostEstimator::new(market, store, Interval::OneHour);
    assert!(estimator.estimate(&Symbol::new("BTCUSDT")).await.is_err());
}
