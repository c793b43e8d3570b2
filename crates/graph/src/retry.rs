//! Bounded exponential backoff for directory writes that race replication.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use cloudlift_core::config::RetryConfig;
use cloudlift_core::error::{CloudliftError, Result};

/// Retry policy for operations that may hit a not-yet-visible object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_secs: config.base_delay_secs,
            max_delay_secs: config.max_delay_secs,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_secs: 0,
            max_delay_secs: 0,
        }
    }

    /// Only not-found-class errors are retried; everything else is terminal.
    pub fn should_retry(&self, attempt: u32, error: &CloudliftError) -> bool {
        attempt < self.max_retries && error.is_not_found()
    }

    /// `min(base * 2^attempt, max)` seconds.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_secs
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_secs(exponential.min(self.max_delay_secs))
    }

    /// Run `f` until it succeeds, fails terminally, or retries are exhausted.
    /// The last error is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "object not visible yet, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if attempt > 0 && error.is_not_found() {
                        warn!(operation, attempts = attempt + 1, error = %error, "retries exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}
