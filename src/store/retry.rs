// src/store/retry.rs
use crate::error::{Result, StoreError};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

// Cap on the backoff exponent, so the longest wait is retry_delay * 64
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Bounded exponential backoff around a single storage call. Only
/// [`StoreError::TransientStorage`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_max: u32,
    /// Delay before the first retry; doubled for every retry after it
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_max: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(retry_max: u32, retry_delay: Duration) -> Self {
        Self {
            retry_max,
            retry_delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.retry_delay.saturating_mul(1 << shift)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(StoreError::TransientStorage { source, .. }) if attempt <= self.retry_max => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed on attempt {}/{}: {}; retrying in {:?}",
                        operation,
                        attempt,
                        self.retry_max + 1,
                        source,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(StoreError::TransientStorage { source, .. }) => {
                    error!("{} gave up after {} attempt(s): {}", operation, attempt, source);
                    return Err(StoreError::TransientStorage {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
