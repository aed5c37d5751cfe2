//! Bounded retry with exponential backoff

use crate::config::HarvestConfig;
use std::time::Duration;

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.commit_attempts,
            Duration::from_millis(config.backoff_base_ms),
        )
    }

    /// Delay after the `failed_attempt`-th failure: base, 2 x base, 4 x base, ...
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Outcome of one try
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Success(T),
    /// The operation's effect is already in place; stop without retrying
    Duplicate,
    /// A transient failure worth another try
    Retry(String),
}

/// Tagged result of [`retry_with_backoff`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    Duplicate,
    Failed { attempts: u32, last_error: String },
}

/// Runs `operation` until it succeeds, reports a duplicate, or the policy's
/// attempt budget is spent
///
/// `operation` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F>(policy: &BackoffPolicy, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Attempt<T>,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match operation(attempt) {
            Attempt::Success(value) => return RetryOutcome::Success(value),
            Attempt::Duplicate => return RetryOutcome::Duplicate,
            Attempt::Retry(error) => {
                last_error = error;
                if attempt < policy.max_attempts {
                    let delay = policy.delay_after(attempt);
                    tracing::debug!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        policy.max_attempts,
                        last_error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    RetryOutcome::Failed {
        attempts: policy.max_attempts,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_delays_double() {
        let policy = BackoffPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(instant(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let mut calls = Vec::new();
        let outcome = retry_with_backoff(&instant(3), |attempt| {
            calls.push(attempt);
            if attempt < 3 {
                Attempt::Retry("busy".to_string())
            } else {
                Attempt::Success(attempt)
            }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Success(3));
        assert_eq!(calls, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_stops_immediately() {
        let mut calls = 0;
        let outcome: RetryOutcome<()> = retry_with_backoff(&instant(3), |_| {
            calls += 1;
            Attempt::Duplicate
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Duplicate);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let outcome: RetryOutcome<()> =
            retry_with_backoff(&instant(3), |attempt| Attempt::Retry(format!("error {}", attempt)))
                .await;

        assert_eq!(
            outcome,
            RetryOutcome::Failed {
                attempts: 3,
                last_error: "error 3".to_string()
            }
        );
    }
}
