//! Explicit retry for producers.
//!
//! The cache never retries on its own. Callers that want retries wrap
//! their producer with [`with_retry`], typically using
//! [`LoadConfig::retry_config()`](crate::LoadConfig::retry_config).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::FetchError;
use crate::telemetry;

/// Configuration for retrying transient fetch failures.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use corral::api::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(2), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 10s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// `initial_delay * 2^attempt`, capped at `max_delay` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
///
/// Only [`FetchError::is_transient`] failures are retried. The last error
/// is returned once attempts are exhausted.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    f: F,
) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
                    .increment(1);
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
