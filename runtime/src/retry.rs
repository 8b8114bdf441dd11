//! Retry with exponential backoff for transient failures.
//!
//! Used around notification dispatch. The default policy retries nothing, so a
//! failed dispatch is logged once and the message moves on.
//!
//! # Example
//!
//! ```rust
//! use hotel_booking_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(50))
//!     .build();
//!
//! let value = retry_with_backoff(&policy, || async { Ok::<_, String>(42) }, |_| true).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 0
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Growth factor between delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self::none(),
        }
    }

    /// Delay before retry number `attempt` (zero-based), capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        if !factor.is_finite() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Set maximum delay.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `operation`, retrying failures that `is_retryable` accepts.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once `max_retries` is spent.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => {
                tracing::debug!(error = %err, "Error is not retryable");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_retries => {
                if policy.max_retries > 0 {
                    tracing::warn!(attempt, error = %err, "Operation failed after max retries");
                }
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Operation failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_failures(
        counter: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, String>> {
        move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if attempt < failures {
                Err(format!("attempt {attempt} failed"))
            } else {
                Ok(attempt)
            })
        }
    }

    #[test]
    fn delay_grows_and_caps() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_millis(500))
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1000), Duration::from_millis(500));
    }

    #[test]
    fn oversized_delay_falls_back_to_max() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_secs(1))
            .multiplier(1e200)
            .max_delay(Duration::from_secs(30))
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn default_policy_makes_one_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let operation = counting_failures(Arc::clone(&counter), 5);

        let result = retry_with_backoff(&RetryPolicy::default(), operation, |_| true).await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .build();
        let counter = Arc::new(AtomicU32::new(0));

        let operation = counting_failures(Arc::clone(&counter), 2);

        let result = retry_with_backoff(&policy, operation, |_| true).await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let policy = RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .build();
        let counter = Arc::new(AtomicU32::new(0));

        let operation = counting_failures(Arc::clone(&counter), 5);

        let result = retry_with_backoff(&policy, operation, |err: &String| {
            err.contains("transient")
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
