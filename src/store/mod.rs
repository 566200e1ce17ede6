//! Series persistence
//!
//! One file per (symbol, interval). The store is read by estimator and executor
//! workers but only ever written from the orchestrating task, after a batch has
//! fully drained.

use crate::{Series, Symbol};

pub mod csv;
pub mod lock;

pub use self::csv::CsvSeriesStore;
pub use lock::StoreLock;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Stored data is not a valid series
    #[error("corrupt series in {path}: {reason}")]
    Corrupt {
        /// File holding the series
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Another run holds the store lock
    #[error("store lock error: {0}")]
    LockError(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Per-symbol series persistence
pub trait SeriesStore: Send + Sync {
    /// Load the stored series, `None` when nothing has been stored yet
    fn load(&self, symbol: &Symbol) -> StoreResult<Option<Series>>;

    /// Persist the full series, replacing previous content
    fn save(&self, symbol: &Symbol, series: &Series) -> StoreResult<()>;

    /// Open time of the last stored candle
    fn last_timestamp(&self, symbol: &Symbol) -> StoreResult<Option<i64>> {
        Ok(self.load(symbol)?.and_then(|s| s.last_timestamp()))
    }
}
