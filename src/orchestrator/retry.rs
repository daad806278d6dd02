//! Retry budget and exponential backoff schedule.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};

use crate::backend::BackendErrorCode;
use crate::error::{Error, Result};

/// Retry configuration for generation requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Exponential base
    pub base: f64,

    /// Delay unit (milliseconds)
    pub unit_ms: u64,

    /// Longest single delay (milliseconds)
    pub cap_ms: u64,

    /// Wall-clock bound on one attempt (milliseconds)
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: 2.0,
            unit_ms: 1_000,
            cap_ms: 16_000,
            attempt_timeout_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// `min(cap, base^attempt * unit)` for the 1-based attempt that just failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base.powi(attempt as i32) * self.unit_ms as f64;
        Duration::from_millis(raw.min(self.cap_ms as f64) as u64)
    }

    /// Fresh backoff schedule yielding `delay_for(1)`, `delay_for(2)`, ...
    pub fn schedule(&self) -> ExponentialBackoff {
        let first = self.delay_for(1);
        ExponentialBackoff {
            current_interval: first,
            initial_interval: first,
            randomization_factor: 0.0,
            multiplier: self.base,
            max_interval: Duration::from_millis(self.cap_ms),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Whether a failure of this class earns another attempt.
    pub fn is_retryable(code: BackendErrorCode) -> bool {
        matches!(
            code,
            BackendErrorCode::QuotaExceeded | BackendErrorCode::NetworkError
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config_field_invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.base < 1.0 {
            return Err(Error::config_field_invalid("retry.base", "must be at least 1.0"));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(Error::config_field_invalid(
                "retry.attempt_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Iterator-style wrapper over the backoff crate's schedule.
pub struct RetrySchedule {
    inner: ExponentialBackoff,
}

impl RetrySchedule {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            inner: policy.schedule(),
        }
    }

    /// Next delay. With no elapsed-time limit the schedule never ends.
    pub fn next_delay(&mut self) -> Duration {
        self.inner.next_backoff().unwrap_or(self.inner.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_formula() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(10), Duration::from_secs(16));
    }

    #[test]
    fn test_schedule_follows_formula() {
        let policy = RetryPolicy::default();
        let mut schedule = RetrySchedule::new(&policy);
        for attempt in 1..=6 {
            let delay = schedule.next_delay();
            let expected = policy.delay_for(attempt);
            // The backoff crate may add up to a nanosecond of jitter at factor 0
            assert!(delay >= expected, "attempt {}: {:?} < {:?}", attempt, delay, expected);
            assert!(delay <= expected + Duration::from_millis(1));
        }
    }

    #[test]
    fn test_retry_classes() {
        assert!(RetryPolicy::is_retryable(BackendErrorCode::QuotaExceeded));
        assert!(RetryPolicy::is_retryable(BackendErrorCode::NetworkError));
        assert!(!RetryPolicy::is_retryable(BackendErrorCode::AuthInvalid));
        assert!(!RetryPolicy::is_retryable(BackendErrorCode::Unknown));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        let bad = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
