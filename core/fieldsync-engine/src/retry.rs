//! Exponential backoff retry for gateway calls.

use crate::error::{GatewayError, GatewayResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy for one reconciliation call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 0 behaves like 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Cap for any single delay, including server-provided ones.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Whether a failure after `attempts` completed attempts should be
    /// attempted again.
    pub fn should_retry(&self, attempts: u32, error: &GatewayError) -> bool {
        attempts < self.max_attempts.max(1) && error.is_retryable()
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
    ///
    /// A rate-limit error carrying a server-provided delay uses that instead.
    /// Either is capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, error: &GatewayError) -> Duration {
        let delay = error.retry_after().unwrap_or_else(|| {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        });
        delay.min(self.max_delay)
    }

    /// Runs `f` until it succeeds, fails fatally, or attempts run out.
    ///
    /// The last failure is returned unchanged. `retries` is incremented for
    /// every retry performed so callers can report it even on failure.
    /// Cancellation is checked before every attempt and interrupts backoff.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        retries: &mut u32,
        mut f: F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut retry: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let error = match f().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(operation, attempts = retry + 1, "Operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(retry + 1, &error) {
                if error.is_retryable() {
                    warn!(operation, attempts = retry + 1, error = %error, "Max retries exceeded");
                }
                return Err(error);
            }

            retry += 1;
            *retries += 1;
            let delay = self.delay_for(retry, &error);
            debug!(
                operation,
                attempt = retry,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
