//! Request-weight limiter
//!
//! A semaphore sized to the exchange's weight budget. Every acquired permit is
//! held for the full window before it returns to the pool, so no window can see
//! more than `max_weight` units. This sits under the batch pacer as a per-request
//! safety net.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Weight-based rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_weight: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a weight-based rate limiter
    ///
    /// # Arguments
    /// * `max_weight` - Maximum weight units per window
    /// * `window` - Time window for rate limit
    pub fn weight_based(max_weight: usize, window: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_weight)),
            max_weight,
            window,
        }
    }

    /// Total weight per window
    pub fn capacity(&self) -> usize {
        self.max_weight
    }

    /// Weight that can be acquired right now without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire `weight` units, waiting for earlier requests to age out if needed
    ///
    /// A request heavier than the whole budget is clamped to the budget so it can
    /// still proceed once the window is empty.
    pub async fn acquire(&self, weight: usize) -> Result<(), RateLimitError> {
        let weight = weight.clamp(1, self.max_weight.max(1));
        let permits = u32::try_from(weight)
            .map_err(|_| RateLimitError::AcquireError(format!("weight {weight} too large")))?;

        let permit = self
            .semaphore
            .clone()
            .acquire_many_owned(permits)
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permits: {0}")]
    AcquireError(String),
}
