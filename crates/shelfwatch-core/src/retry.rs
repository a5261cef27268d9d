//! Retry logic with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retrying failed provider calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(2),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculate the delay for a given 0-based retry attempt.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Configuration for retrying transient provider failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// HTTP status codes that count as transient.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Runs `operation` until it succeeds, returns a non-retryable error, or
    /// the attempt budget is spent. `is_retryable` classifies each error.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_retries = if self.enabled { self.max_retries } else { 0 };
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_retries && is_retryable(&error) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
