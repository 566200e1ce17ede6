//! End-to-end runs against an in-memory exchange and a CSV store in a temp dir

use crate::support::{FakeMarket, ReadOnlyStore, Stream, DAY, HOUR};
use kline_harvester::config::RunConfig;
use kline_harvester::downloader::{Orchestrator, RunError, RunState};
use kline_harvester::store::{CsvSeriesStore, SeriesStore};
use kline_harvester::{Interval, Symbol};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Two days of hourly candles: 48 klines, one request each
fn two_days() -> Stream {
    Stream::new(0, 2 * DAY - HOUR)
}

fn setup(streams: &[(&str, Stream)]) -> (TempDir, RunConfig, Arc<FakeMarket>, Arc<CsvSeriesStore>) {
    let temp_dir = TempDir::new().unwrap();
    let config = RunConfig::new(Interval::OneHour, temp_dir.path());
    let market = FakeMarket::new(streams);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneHour));
    (temp_dir, config, market, store)
}

#[tokio::test]
async fn test_one_failing_symbol_does_not_stop_the_batch() {
    let (_dir, config, market, store) = setup(&[
        ("AAAUSDT", two_days()),
        ("BBBUSDT", two_days()),
        ("BADUSDT", two_days().failing_fetch()),
        ("CCCUSDT", two_days()),
        ("DDDUSDT", two_days()),
    ]);

    let report = Orchestrator::new(config, market.clone(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.symbols_listed, 5);
    assert_eq!(report.batches, 1);
    assert_eq!(report.symbols_saved, 4);
    assert_eq!(report.symbols_failed, 1);
    assert_eq!(report.candles_written, 4 * 48);
    assert_eq!(report.failures[0].symbol, Symbol::new("BADUSDT"));

    for name in ["AAAUSDT", "BBBUSDT", "CCCUSDT", "DDDUSDT"] {
        let series = store.load(&Symbol::new(name)).unwrap().unwrap();
        assert_eq!(series.len(), 48);
    }
    assert!(!store.path_for(&Symbol::new("BADUSDT")).exists());
}

#[tokio::test]
async fn test_second_run_appends_only_new_candles() {
    let (_dir, config, market, store) = setup(&[("BTCUSDT", two_days())]);
    let symbol = Symbol::new("BTCUSDT");

    let first = Orchestrator::new(config.clone(), market.clone(), store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(first.candles_written, 48);

    market.set_latest("BTCUSDT", 4 * DAY - HOUR);
    let second = Orchestrator::new(config.clone(), market.clone(), store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(second.symbols_saved, 1);
    assert_eq!(second.candles_written, 48);

    let fetches = market.fetches();
    assert_eq!(fetches[1].1, 2 * DAY - HOUR + 1);
    assert_eq!(fetches[1].2, 4 * DAY - HOUR);

    let series = store.load(&symbol).unwrap().unwrap();
    assert_eq!(series.len(), 96);
    assert!(series
        .candles()
        .windows(2)
        .all(|pair| pair[1].open_time - pair[0].open_time == HOUR));
}

#[tokio::test]
async fn test_symbols_less_than_a_day_behind_are_skipped() {
    let (_dir, config, market, store) = setup(&[("BTCUSDT", two_days())]);

    Orchestrator::new(config.clone(), market.clone(), store.clone())
        .run()
        .await
        .unwrap();

    market.set_latest("BTCUSDT", 2 * DAY + 5 * HOUR);
    let report = Orchestrator::new(config, market.clone(), store)
        .run()
        .await
        .unwrap();

    assert_eq!(report.symbols_skipped, 1);
    assert_eq!(report.batches, 0);
    assert_eq!(report.symbols_saved, 0);
    assert_eq!(market.fetches().len(), 1);
}

#[tokio::test]
async fn test_failed_estimate_skips_symbol() {
    let (_dir, config, market, store) = setup(&[
        ("AAAUSDT", two_days()),
        ("BADUSDT", two_days().failing_estimate()),
        ("CCCUSDT", two_days()),
    ]);

    let report = Orchestrator::new(config, market.clone(), store)
        .run()
        .await
        .unwrap();

    assert_eq!(report.symbols_saved, 2);
    assert_eq!(report.symbols_failed, 1);
    assert!(report.failures[0].error.contains("estimate failed"));
    assert!(market
        .fetches()
        .iter()
        .all(|(symbol, ..)| symbol.as_str() != "BADUSDT"));
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_paced_one_window_apart() {
    let (_dir, config, market, store) = setup(&[
        ("AAAUSDT", two_days()),
        ("BBBUSDT", two_days()),
        ("CCCUSDT", two_days()),
    ]);
    // probe overhead 2 + cost 1 per symbol: [AAA] closes when BBB arrives
    let config = config
        .with_weight_ceiling(5)
        .with_pacing_window(Duration::from_secs(60));

    let report = Orchestrator::new(config, market.clone(), store)
        .run()
        .await
        .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.symbols_saved, 3);

    let fetches = market.fetches();
    let first = fetches[0].3;
    for (symbol, _, _, at) in &fetches[1..] {
        assert!(
            at.duration_since(first) >= Duration::from_secs(60),
            "{symbol} fetched before the pacing window elapsed"
        );
    }
}

#[tokio::test]
async fn test_trailing_batch_is_not_paced() {
    let (_dir, config, market, store) = setup(&[("AAAUSDT", two_days())]);
    let config = config.with_pacing_window(Duration::from_secs(3600));

    let report = tokio::time::timeout(
        Duration::from_secs(30),
        Orchestrator::new(config, market, store).run(),
    )
    .await
    .expect("final flush must not wait for the pacing window")
    .unwrap();

    assert_eq!(report.symbols_saved, 1);
}

#[tokio::test]
async fn test_connectivity_failure_is_fatal() {
    let (dir, config, market, store) = setup(&[("AAAUSDT", two_days())]);
    market.fail_ping();

    let result = Orchestrator::new(config, market.clone(), store).run().await;

    assert!(matches!(result, Err(RunError::Connectivity(_))));
    assert!(market.fetches().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let (_dir, config, market, store) = setup(&[("AAAUSDT", two_days())]);
    market.fail_listing();

    let result = Orchestrator::new(config, market, store).run().await;

    assert!(matches!(result, Err(RunError::Listing(_))));
}

#[tokio::test]
async fn test_store_write_failure_is_fatal() {
    let (dir, config, market, _) = setup(&[("AAAUSDT", two_days()), ("BBBUSDT", two_days())]);
    let store = Arc::new(ReadOnlyStore(CsvSeriesStore::new(
        dir.path(),
        Interval::OneHour,
    )));

    let result = Orchestrator::new(config, market, store).run().await;

    match result {
        Err(RunError::StoreWrite { symbol, .. }) => assert_eq!(symbol, Symbol::new("AAAUSDT")),
        other => panic!("expected store write failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plan_matches_reference_scenario() {
    const MINUTE: i64 = 60_000;
    let temp_dir = TempDir::new().unwrap();
    let config = RunConfig::new(Interval::OneMinute, temp_dir.path());
    let market = FakeMarket::new(&[
        ("A", Stream::new(0, HOUR)),
        ("B", Stream::new(0, 599_000 * MINUTE)),
        ("C", Stream::new(0, 699_000 * MINUTE)),
        ("D", Stream::new(0, 49_000 * MINUTE)),
    ]);
    let store = Arc::new(CsvSeriesStore::new(temp_dir.path(), Interval::OneMinute));

    let batches = Orchestrator::new(config, market.clone(), store)
        .plan()
        .await
        .unwrap();

    let names: Vec<Vec<&str>> = batches
        .iter()
        .map(|b| b.symbols().map(|s| s.as_str()).collect())
        .collect();
    assert_eq!(names, vec![vec!["B"], vec!["C", "D"]]);
    assert_eq!(batches[0].total_cost(), 600);
    assert_eq!(batches[1].total_cost(), 750);
    assert!(market.fetches().is_empty());
}
