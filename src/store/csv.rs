//! CSV series store
//!
//! Each series lives in `<data_dir>/<SYMBOL>-<interval>.csv` with one header row and
//! one row per candle. Prices and volumes are written in their exact decimal form
//! so a save/load round trip is lossless.

use crate::{Candle, Interval, Series, Symbol};
use csv::{Reader, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::{SeriesStore, StoreError, StoreResult};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// CSV record for one candle
#[derive(Debug, Serialize, Deserialize)]
struct CandleRecord {
    open_time: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
    close_time: i64,
    quote_volume: String,
    trades: u64,
    taker_buy_base_volume: String,
    taker_buy_quote_volume: String,
}

impl From<&Candle> for CandleRecord {
    fn from(candle: &Candle) -> Self {
        Self {
            open_time: candle.open_time,
            open: candle.open.to_string(),
            high: candle.high.to_string(),
            low: candle.low.to_string(),
            close: candle.close.to_string(),
            volume: candle.volume.to_string(),
            close_time: candle.close_time,
            quote_volume: candle.quote_volume.to_string(),
            trades: candle.trades,
            taker_buy_base_volume: candle.taker_buy_base_volume.to_string(),
            taker_buy_quote_volume: candle.taker_buy_quote_volume.to_string(),
        }
    }
}

impl CandleRecord {
    fn into_candle(self) -> Result<Candle, String> {
        let decimal = |value: &str, field: &str| {
            Decimal::from_str(value).map_err(|e| format!("invalid {field} '{value}': {e}"))
        };

        Ok(Candle {
            open_time: self.open_time,
            open: decimal(&self.open, "open")?,
            high: decimal(&self.high, "high")?,
            low: decimal(&self.low, "low")?,
            close: decimal(&self.close, "close")?,
            volume: decimal(&self.volume, "volume")?,
            close_time: self.close_time,
            quote_volume: decimal(&self.quote_volume, "quote_volume")?,
            trades: self.trades,
            taker_buy_base_volume: decimal(&self.taker_buy_base_volume, "taker_buy_base_volume")?,
            taker_buy_quote_volume: decimal(
                &self.taker_buy_quote_volume,
                "taker_buy_quote_volume",
            )?,
        })
    }
}

/// Series store backed by one CSV file per symbol
#[derive(Debug, Clone)]
pub struct CsvSeriesStore {
    dir: PathBuf,
    interval: Interval,
}

impl CsvSeriesStore {
    /// Create a store rooted at `dir` for one interval
    pub fn new(dir: impl Into<PathBuf>, interval: Interval) -> Self {
        Self {
            dir: dir.into(),
            interval,
        }
    }

    /// File backing a symbol's series
    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.dir.join(format!("{}-{}.csv", symbol, self.interval))
    }

    fn open_reader(&self, path: &Path) -> StoreResult<Reader<File>> {
        Reader::from_path(path)
            .map_err(|e| StoreError::CsvError(format!("Failed to open {}: {e}", path.display())))
    }

    fn corrupt(path: &Path, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl SeriesStore for CsvSeriesStore {
    fn load(&self, symbol: &Symbol) -> StoreResult<Option<Series>> {
        let path = self.path_for(symbol);
        if !path.exists() {
            debug!(symbol = %symbol, "No stored series");
            return Ok(None);
        }

        let mut reader = self.open_reader(&path)?;
        let mut candles: Vec<Candle> = Vec::new();

        for (row, record) in reader.deserialize::<CandleRecord>().enumerate() {
            let record = record
                .map_err(|e| StoreError::CsvError(format!("row {}: {e}", row + 1)))?;
            let candle = record
                .into_candle()
                .map_err(|reason| Self::corrupt(&path, format!("row {}: {reason}", row + 1)))?;

            if let Some(prev) = candles.last() {
                if candle.open_time <= prev.open_time {
                    return Err(Self::corrupt(
                        &path,
                        format!(
                            "row {}: open time {} does not follow {}",
                            row + 1,
                            candle.open_time,
                            prev.open_time
                        ),
                    ));
                }
            }
            candles.push(candle);
        }

        debug!(symbol = %symbol, candles = candles.len(), "Loaded stored series");
        Ok(Some(Series::from_candles(candles)))
    }

    fn save(&self, symbol: &Symbol, series: &Series) -> StoreResult<()> {
        let path = self.path_for(symbol);
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::IoError(format!("Failed to create directory: {e}")))?;

        // Written beside the target and renamed over it, so a crash never leaves a
        // truncated series behind.
        let tmp_path = path.with_extension("csv.tmp");
        let file = File::create(&tmp_path)
            .map_err(|e| StoreError::IoError(format!("Failed to create file: {e}")))?;
        let mut writer = Writer::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        for candle in series.candles() {
            writer
                .serialize(CandleRecord::from(candle))
                .map_err(|e| StoreError::CsvError(format!("Failed to write candle: {e}")))?;
        }

        let buf_writer = writer
            .into_inner()
            .map_err(|e| StoreError::IoError(format!("Failed to flush writer: {e}")))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| StoreError::IoError(format!("Failed to get file handle: {e}")))?;
        file.sync_all()
            .map_err(|e| StoreError::IoError(format!("Failed to sync file: {e}")))?;
        drop(file);

        std::fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::IoError(format!("Failed to replace {}: {e}", path.display())))?;

        info!(
            symbol = %symbol,
            candles = series.len(),
            path = %path.display(),
            "Saved series"
        );
        Ok(())
    }
}
