//! Retry policy with configurable backoff.
//!
//! [`RetryPolicy`] runs fallible async operations, retrying transient
//! failures with an optional delay between attempts. Whether an error is
//! transient comes from the [`Retryable`] trait, so the policy works for any
//! error type that implements it. Retries are strictly sequential; an
//! operation is never attempted concurrently with itself.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Retryable;

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Wait the initial delay before every retry.
    Fixed,
    /// Double the delay after each failed attempt, capped at the maximum.
    Exponential,
}

/// Configuration for retrying failed operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub attempts: u32,
    /// Delay strategy between attempts.
    pub backoff: Backoff,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Backoff::Exponential,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given parameters.
    pub fn new(attempts: u32, backoff: Backoff, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
            initial_delay,
            max_delay,
        }
    }

    /// Creates a policy that tries exactly once and never retries.
    pub fn disabled() -> Self {
        Self {
            attempts: 1,
            backoff: Backoff::None,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Computes the delay before the retry following failed attempt
    /// `attempt` (0-based).
    ///
    /// Nonzero delays carry up to 10% additive jitter so simultaneous
    /// clients spread out their retries.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = match self.backoff {
            Backoff::None => return Duration::ZERO,
            Backoff::Fixed => self.initial_delay,
            Backoff::Exponential => {
                let factor = if attempt >= 32 {
                    u32::MAX
                } else {
                    1u32 << attempt
                };
                self.initial_delay
                    .saturating_mul(factor)
                    .min(self.max_delay)
            }
        };
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.1));
        base + jitter
    }

    /// Runs `operation` under this policy.
    ///
    /// The operation is invoked up to `attempts` times. A non-retryable
    /// error fails immediately regardless of remaining attempts; once
    /// attempts are exhausted the last error is returned unmodified.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let policy = RetryPolicy::default();
    /// let email = policy.run(|| provider.get(&id)).await?;
    /// ```
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut failed = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    failed += 1;
                    if !err.retryable() || failed >= attempts {
                        return Err(err);
                    }

                    let delay = self.delay_for(failed - 1);
                    tracing::warn!(
                        attempt = failed,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "operation failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
