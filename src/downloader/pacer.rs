//! Batch pacing
//!
//! Stretches each batch to at least one pacing window so consecutive batches
//! cannot spend more than one ceiling's worth of weight per window.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Sleeps away whatever is left of the window after a batch
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    window: Duration,
}

impl Pacer {
    /// Create a pacer for the given window
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Pacing window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time still to wait after a batch that took `elapsed`
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.window.saturating_sub(elapsed)
    }

    /// Wait until `start + window`, given a batch spanning `start..end`
    ///
    /// Returns the time actually slept.
    pub async fn pace(&self, start: Instant, end: Instant) -> Duration {
        let wait = self.remaining(end.saturating_duration_since(start));
        if wait.is_zero() {
            debug!("Batch used the full pacing window, no wait");
            return wait;
        }

        debug!(wait_ms = wait.as_millis() as u64, "Pacing before next batch");
        sleep(wait).await;
        wait
    }
}
