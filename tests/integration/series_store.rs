//! CSV store behaviour across save/load cycles

use crate::support::{candle, HOUR};
use kline_harvester::store::{CsvSeriesStore, SeriesStore, StoreError, StoreLock};
use kline_harvester::{Interval, Series, Symbol};
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

fn hourly(range: std::ops::Range<i64>) -> Vec<kline_harvester::Candle> {
    range.map(|i| candle(i * HOUR, Interval::OneHour)).collect()
}

#[test]
fn test_loaded_series_plus_new_candles_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store = CsvSeriesStore::new(temp_dir.path(), Interval::OneHour);
    let symbol = Symbol::new("ETHUSDT");

    store
        .save(&symbol, &Series::from_candles(hourly(0..24)))
        .unwrap();

    let mut series = store.load(&symbol).unwrap().unwrap();
    let appended = series.extend_from(hourly(20..30), Interval::OneHour);
    assert_eq!(appended, 6);
    store.save(&symbol, &series).unwrap();

    let reloaded = store.load(&symbol).unwrap().unwrap();
    assert_eq!(reloaded, series);
    assert_eq!(reloaded.len(), 30);
    assert_eq!(store.last_timestamp(&symbol).unwrap(), Some(29 * HOUR));

    let first = &reloaded.candles()[0];
    assert_eq!(first.volume, Decimal::from_str("1.00000001").unwrap());
    assert_eq!(first.quote_volume, Decimal::from_str("42.12500042").unwrap());
}

#[test]
fn test_file_is_named_after_symbol_and_interval() {
    let temp_dir = TempDir::new().unwrap();
    let store = CsvSeriesStore::new(temp_dir.path(), Interval::FiveMinutes);
    let symbol = Symbol::new("BNBBTC");

    store
        .save(&symbol, &Series::from_candles(vec![candle(0, Interval::FiveMinutes)]))
        .unwrap();

    assert!(temp_dir.path().join("BNBBTC-5m.csv").exists());
    assert!(!temp_dir.path().join("BNBBTC-5m.csv.tmp").exists());
}

#[test]
fn test_out_of_order_file_is_reported_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let store = CsvSeriesStore::new(temp_dir.path(), Interval::OneHour);
    let symbol = Symbol::new("XRPUSDT");

    store
        .save(&symbol, &Series::from_candles(hourly(0..3)))
        .unwrap();

    let path = store.path_for(&symbol);
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.swap(1, 3);
    std::fs::write(&path, lines.join("\n")).unwrap();

    assert!(matches!(
        store.load(&symbol),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn test_store_lock_excludes_second_run() {
    let temp_dir = TempDir::new().unwrap();

    let mut first = StoreLock::open(temp_dir.path()).unwrap();
    let _guard = first.try_exclusive().unwrap();

    let mut second = StoreLock::open(temp_dir.path()).unwrap();
    assert!(second.try_exclusive().is_err());
}
