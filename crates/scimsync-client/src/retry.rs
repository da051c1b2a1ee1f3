//! Exponential backoff for transient SCIM failures.

use crate::error::{ScimClientError, ScimClientResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently a request is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once).
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further one.
    pub base_delay: Duration,
    /// Upper bound for any single delay, `Retry-After` included.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    /// A policy that gives up after the first failure.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &ScimClientError) -> bool {
        attempt < self.max_retries && (error.is_retryable() || error.is_server_error())
    }

    /// `Retry-After` when the target sent one, otherwise
    /// `base_delay * 2^attempt`; both capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &ScimClientError) -> Duration {
        let delay = match error {
            ScimClientError::RateLimited {
                retry_after_secs: Some(secs),
            } => Duration::from_secs(*secs),
            _ => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_delay)
    }

    /// Run `f` until it succeeds, fails permanently or runs out of retries.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> ScimClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ScimClientResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let error = match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "Succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(attempt, &error) {
                let transient = error.is_retryable() || error.is_server_error();
                if attempt > 0 && transient {
                    warn!(operation, attempts = attempt + 1, error = %error, "Giving up");
                    return Err(ScimClientError::MaxRetriesExceeded {
                        attempts: attempt + 1,
                        message: format!(
                            "{operation} failed after {} attempts: {error}",
                            attempt + 1
                        ),
                    });
                }
                return Err(error);
            }

            let delay = self.delay_for(attempt, &error);
            debug!(
                operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
