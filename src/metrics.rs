//! Run observability metrics
//!
//! Counters and histograms for HTTP traffic (requests, 429s, retries, weight
//! usage), the request limiter, and the batch scheduler (batches, per-symbol
//! outcomes, pacer sleeps).
//!
//! ## Architecture
//!
//! - Uses the `metrics` crate facade; recording is a no-op until an exporter is
//!   installed
//! - Optional Prometheus scrape endpoint installed by [`init_metrics`]

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Whether an exporter has been installed
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Initialize metrics system with Prometheus exporter
///
/// Call once at startup. Later calls are ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(MetricsError::Install(e.to_string()));
    }

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the exchange API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429/418 rate limit responses"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_gauge!(
        "api_weight_consumed",
        Unit::Count,
        "API weight the exchange reports as used in the current minute"
    );
    describe_gauge!(
        "rate_limit_permits_available",
        Unit::Count,
        "Weight currently available in the request limiter"
    );
    describe_histogram!(
        "rate_limit_queue_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for limiter permits"
    );
    describe_counter!(
        "batches_executed_total",
        Unit::Count,
        "Batches executed by the scheduler"
    );
    describe_histogram!(
        "batch_estimated_weight",
        Unit::Count,
        "Estimated request weight of each executed batch"
    );
    describe_counter!(
        "symbols_synced_total",
        Unit::Count,
        "Symbols whose history fetch succeeded"
    );
    describe_counter!(
        "symbols_failed_total",
        Unit::Count,
        "Symbols whose history fetch failed"
    );
    describe_counter!(
        "symbols_skipped_total",
        Unit::Count,
        "Symbols left out of batching"
    );
    describe_histogram!(
        "pacer_sleep_seconds",
        Unit::Seconds,
        "Time slept between batches"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP attempt
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record completion of the HTTP request
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 || status_code == 418 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
            )
            .increment(1);

            warn!(
                correlation_id = %self.correlation_id,
                endpoint = %self.endpoint,
                attempt = self.attempt,
                status = status_code,
                "Rate limit response recorded"
            );
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a network error (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            "Network error recorded"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("http_retries_total").increment(1);
    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record API weight consumption from response headers
pub fn record_api_weight(consumed: u32, limit: u32) {
    gauge!("api_weight_consumed").set(f64::from(consumed));

    let usage_percent = f64::from(consumed) / f64::from(limit.max(1)) * 100.0;
    if usage_percent >= 80.0 {
        warn!(
            consumed = consumed,
            limit = limit,
            usage_percent = usage_percent,
            "API weight usage exceeds 80% threshold"
        );
    }
}

/// Limiter wait-time recorder
#[derive(Default)]
pub struct RateLimiterMetrics {
    start_time: Option<Instant>,
}

impl RateLimiterMetrics {
    /// Create a recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start measuring queue wait time
    pub fn start_acquire(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Record successful permit acquisition
    pub fn record_acquired(&mut self, weight: u32) {
        if let Some(start) = self.start_time.take() {
            let wait = start.elapsed();
            histogram!("rate_limit_queue_wait_seconds").record(wait.as_secs_f64());

            if wait.as_millis() > 100 {
                debug!(
                    weight = weight,
                    wait_ms = wait.as_millis() as u64,
                    "Limiter permits acquired after wait"
                );
            }
        }
    }

    /// Update available permits gauge
    pub fn update_available_permits(&self, available: usize) {
        gauge!("rate_limit_permits_available").set(available as f64);
    }
}

/// Per-symbol sync tracking
pub struct SymbolSyncMetrics {
    symbol: String,
    start_time: Instant,
}

impl SymbolSyncMetrics {
    /// Start tracking one symbol's fetch
    pub fn start(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        debug!(symbol = %symbol, "Symbol sync started");
        Self {
            symbol,
            start_time: Instant::now(),
        }
    }

    /// Record a successful fetch
    pub fn record_success(&self, candles: usize) {
        counter!("symbols_synced_total").increment(1);
        debug!(
            symbol = %self.symbol,
            candles = candles,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Symbol sync completed"
        );
    }

    /// Record a failed fetch
    pub fn record_failure(&self, error: &str) {
        counter!("symbols_failed_total").increment(1);
        debug!(
            symbol = %self.symbol,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Symbol sync failed"
        );
    }
}

/// Record an executed batch
pub fn record_batch(symbols: usize, estimated_weight: u64) {
    counter!("batches_executed_total").increment(1);
    histogram!("batch_estimated_weight").record(estimated_weight as f64);
    debug!(symbols = symbols, weight = estimated_weight, "Batch recorded");
}

/// Record a symbol left out of batching
pub fn record_symbol_skipped(reason: &'static str) {
    counter!("symbols_skipped_total", "reason" => reason).increment(1);
}

/// Record time slept by the pacer
pub fn record_pacer_sleep(slept: Duration) {
    histogram!("pacer_sleep_seconds").record(slept.as_secs_f64());
}
