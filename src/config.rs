//! Run configuration and API credentials
//!
//! Everything the scheduler needs is gathered into a [`RunConfig`] up front and
//! handed to the orchestrator; nothing below this module reads the environment.

use crate::downloader::config::{PACING_WINDOW, PAGE_LIMIT, PROBE_WEIGHT, WEIGHT_CEILING};
use crate::Interval;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "BINANCE_API";

/// Environment variable holding the API secret
pub const API_SECRET_VAR: &str = "BINANCE_SECRET";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is not set
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// API key and secret
#[derive(Clone)]
pub struct Credentials {
    /// API key, sent as the `X-MBX-APIKEY` header
    pub api_key: String,
    /// API secret
    pub api_secret: String,
}

impl Credentials {
    /// Create credentials from explicit values
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load credentials from `BINANCE_API` / `BINANCE_SECRET`
    ///
    /// Missing or blank values are a fatal startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        Ok(Self {
            api_key: read(API_KEY_VAR)?,
            api_secret: read(API_SECRET_VAR)?,
        })
    }
}

// Secrets never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Settings for one harvesting run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Kline interval, constant for the whole run
    pub interval: Interval,
    /// Directory holding one CSV file per symbol
    pub data_dir: PathBuf,
    /// Maximum estimated weight per batch
    pub weight_ceiling: u32,
    /// Weight charged for the probes of every estimated symbol
    pub probe_weight: u32,
    /// Window each batch is paced against
    pub pacing_window: Duration,
    /// Klines requested per page
    pub page_limit: usize,
}

impl RunConfig {
    /// Create a config with the default budget constants
    pub fn new(interval: Interval, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            interval,
            data_dir: data_dir.into(),
            weight_ceiling: WEIGHT_CEILING,
            probe_weight: PROBE_WEIGHT,
            pacing_window: PACING_WINDOW,
            page_limit: PAGE_LIMIT,
        }
    }

    /// Override the batch weight ceiling
    pub fn with_weight_ceiling(mut self, ceiling: u32) -> Self {
        self.weight_ceiling = ceiling;
        self
    }

    /// Override the pacing window
    pub fn with_pacing_window(mut self, window: Duration) -> Self {
        self.pacing_window = window;
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weight_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "weight ceiling must be at least 1".to_string(),
            ));
        }
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid(
                "page limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
