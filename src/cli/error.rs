//! CLI error types and conversions

use crate::config::ConfigError;
use crate::downloader::RunError;
use crate::fetcher::FetcherError;
use crate::metrics::MetricsError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration or credentials error
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// Fetcher could not be set up
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Store error outside a run
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Run aborted
    #[error("run failed: {0}")]
    RunError(#[from] RunError),

    /// Metrics exporter could not be installed
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Result could not be rendered
    #[error("output error: {0}")]
    OutputError(String),
}
