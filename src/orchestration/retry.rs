//! # Stage Retry Policy
//!
//! Retries are off unless configured. When enabled, only the failing job is re-run;
//! jobs that already committed are never repeated.
//!
//! - Deadlocks (SQLSTATE 40P01) retry up to `deadlock_retries` times after a short
//!   linear delay with random jitter, so colliding workers spread out.
//! - Any other failure retries up to `max_retries` times with exponential backoff
//!   capped at `max_delay`.
//!
//! The two budgets are counted independently.

use crate::config::RetryConfig;
use crate::error::StageExecutionError;
use std::time::Duration;

const DEADLOCK_BASE_DELAY_MS: u64 = 50;
const DEADLOCK_STEP_MS: u64 = 25;
const DEADLOCK_JITTER_MS: u64 = 100;
const DEADLOCK_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub deadlock_retries: u32,
}

/// Failed attempts of one job so far, split by failure kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounter {
    pub deadlock: u32,
    pub other: u32,
}

impl AttemptCounter {
    pub fn total(&self) -> u32 {
        self.deadlock + self.other
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RetryPolicy {
    /// No retries: the first failure of a job fails its pipeline
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            deadlock_retries: 0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor.max(1.0),
            deadlock_retries: config.deadlock_retries,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0 || self.deadlock_retries > 0
    }

    /// Record `error` against `attempts` and return the delay before the next attempt,
    /// or `None` when the job has exhausted its budget for this kind of failure.
    pub fn next_delay(
        &self,
        error: &StageExecutionError,
        attempts: &mut AttemptCounter,
    ) -> Option<Duration> {
        if error.is_deadlock() {
            if attempts.deadlock >= self.deadlock_retries {
                return None;
            }
            let delay = self.deadlock_delay(attempts.deadlock);
            attempts.deadlock += 1;
            Some(delay)
        } else {
            if attempts.other >= self.max_retries {
                return None;
            }
            let delay = self.backoff_delay(attempts.other);
            attempts.other += 1;
            Some(delay)
        }
    }

    /// `initial_delay * backoff_factor^attempt`, capped at `max_delay`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_ms = self.initial_delay.as_millis() as f64 * factor;
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    fn deadlock_delay(&self, attempt: u32) -> Duration {
        let base = DEADLOCK_BASE_DELAY_MS + u64::from(attempt) * DEADLOCK_STEP_MS;
        let jitter = fastrand::u64(0..DEADLOCK_JITTER_MS);
        Duration::from_millis(base + jitter).min(DEADLOCK_MAX_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageErrorKind;

    fn failure(kind: StageErrorKind) -> StageExecutionError {
        StageExecutionError::new("LOD2 02_surfaces.sql", kind, "boom")
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        let mut attempts = AttemptCounter::default();

        assert!(!policy.is_enabled());
        assert_eq!(policy.next_delay(&failure(StageErrorKind::Database), &mut attempts), None);
        assert_eq!(policy.next_delay(&failure(StageErrorKind::Deadlock), &mut attempts), None);
        assert_eq!(attempts.total(), 0);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            deadlock_retries: 0,
        };

        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(500));
    }

    #[test]
    fn test_regular_budget_is_exhausted() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::disabled()
        };
        let mut attempts = AttemptCounter::default();
        let error = failure(StageErrorKind::Database);

        assert!(policy.next_delay(&error, &mut attempts).is_some());
        assert!(policy.next_delay(&error, &mut attempts).is_some());
        assert!(policy.next_delay(&error, &mut attempts).is_none());
        assert_eq!(attempts, AttemptCounter { deadlock: 0, other: 2 });
    }

    #[test]
    fn test_deadlock_budget_is_independent() {
        let policy = RetryPolicy {
            max_retries: 0,
            deadlock_retries: 3,
            ..RetryPolicy::disabled()
        };
        let mut attempts = AttemptCounter::default();
        let deadlock = failure(StageErrorKind::Deadlock);

        for _ in 0..3 {
            let delay = policy.next_delay(&deadlock, &mut attempts).unwrap();
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= DEADLOCK_MAX_DELAY);
        }
        assert!(policy.next_delay(&deadlock, &mut attempts).is_none());
        assert!(policy
            .next_delay(&failure(StageErrorKind::Database), &mut attempts)
            .is_none());
        assert_eq!(attempts.total(), 3);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 1000,
            backoff_factor: 1.5,
            deadlock_retries: 5,
        };
        let policy = RetryPolicy::from_config(&config);
        assert!(policy.is_enabled());
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
        assert_eq!(policy.deadlock_retries, 5);
    }
}
