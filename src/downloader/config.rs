//! Scheduler and HTTP budget constants

use std::time::Duration;

/// Request weight the exchange allows per rolling minute.
pub const REMOTE_WEIGHT_LIMIT: u32 = 1200;

/// Window the exchange's weight limit is measured over.
pub const REMOTE_WEIGHT_WINDOW: Duration = Duration::from_secs(60);

/// Maximum estimated weight of one batch.
/// Stays below [`REMOTE_WEIGHT_LIMIT`] to leave room for estimation probes and
/// estimate error.
pub const WEIGHT_CEILING: u32 = 1100;

/// Weight charged for the probes behind every cost estimate, whatever the
/// server actually bills for them.
pub const PROBE_WEIGHT: u32 = 2;

/// Each batch is stretched to at least this long before the next one starts.
pub const PACING_WINDOW: Duration = Duration::from_secs(60);

/// Klines requested per page, and assumed returned per request when estimating.
pub const PAGE_LIMIT: usize = 1000;

/// Maximum number of retries for failed requests.
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let factor = 2u64.saturating_pow(retry_count);
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
