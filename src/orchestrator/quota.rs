//! Quota bookkeeping and the two-layer request throttle.
//!
//! Layer one is window based: a hard block once `max_requests` have been
//! issued in the current window, and a capped proportional delay once the
//! count passes `soft_threshold`. Layer two is a fixed minimum gap between
//! consecutive requests, applied regardless of window occupancy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Throttle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaPolicy {
    /// Length of the rolling window (seconds)
    pub window_secs: u64,

    /// Hard cap on requests per window
    pub max_requests: u32,

    /// Count at which proportional slowdown starts
    pub soft_threshold: u32,

    /// Minimum gap between consecutive requests (milliseconds)
    pub min_gap_ms: u64,

    /// Extra delay per request over the soft threshold (milliseconds)
    pub overage_step_ms: u64,

    /// Upper bound on the overage delay (milliseconds)
    pub max_overage_delay_ms: u64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 15,
            soft_threshold: 10,
            min_gap_ms: 4_000,
            overage_step_ms: 2_000,
            max_overage_delay_ms: 10_000,
        }
    }
}

impl QuotaPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn min_gap(&self) -> Duration {
        Duration::from_millis(self.min_gap_ms)
    }

    /// Delay for a request issued when `count` requests are already in the window.
    pub fn overage_delay(&self, count: u32) -> Duration {
        if count < self.soft_threshold {
            return Duration::ZERO;
        }
        let over = u64::from(count - self.soft_threshold + 1);
        Duration::from_millis(
            self.overage_step_ms
                .saturating_mul(over)
                .min(self.max_overage_delay_ms),
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(Error::config_field_invalid("quota.window_secs", "must be greater than 0"));
        }
        if self.max_requests == 0 {
            return Err(Error::config_field_invalid("quota.max_requests", "must be greater than 0"));
        }
        if self.soft_threshold > self.max_requests {
            return Err(Error::config_field_invalid(
                "quota.soft_threshold",
                format!(
                    "must not exceed max_requests ({} > {})",
                    self.soft_threshold, self.max_requests
                ),
            ));
        }
        Ok(())
    }
}

/// Counters for the current window.
#[derive(Debug, Clone, Default)]
pub struct QuotaState {
    /// Requests issued in the current window
    pub count: u32,
    /// Start of the current window
    pub window_start: Option<Instant>,
    /// When the last request was issued
    pub last_request: Option<Instant>,
}

impl QuotaState {
    fn roll(&mut self, now: Instant, window: Duration) {
        if let Some(start) = self.window_start {
            if now.duration_since(start) >= window {
                self.count = 0;
                self.window_start = None;
            }
        }
    }
}

/// Serialized gate every backend call passes through.
///
/// The state lock is held across the throttle sleeps so concurrent callers
/// sharing one client queue up behind each other.
#[derive(Debug)]
pub struct QuotaGate {
    policy: QuotaPolicy,
    state: Mutex<QuotaState>,
}

impl QuotaGate {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(QuotaState::default()),
        }
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Copy of the current counters.
    pub async fn snapshot(&self) -> QuotaState {
        self.state.lock().await.clone()
    }

    /// Wait until a request may be issued, then count it.
    ///
    /// Returns how long the caller was held back. Never drops a request.
    pub async fn acquire(&self) -> Duration {
        let mut state = self.state.lock().await;
        let started = Instant::now();
        let window = self.policy.window();

        loop {
            state.roll(Instant::now(), window);
            if state.count < self.policy.max_requests {
                break;
            }
            // Hard limit: hold until the window rolls over
            if let Some(start) = state.window_start {
                debug!(count = state.count, "Quota window full, waiting for rollover");
                sleep_until(start + window).await;
            }
        }

        let overage = self.policy.overage_delay(state.count);
        if !overage.is_zero() {
            debug!(count = state.count, delay_ms = overage.as_millis() as u64, "Quota soft threshold");
            sleep(overage).await;
        }

        if let Some(last) = state.last_request {
            let earliest = last + self.policy.min_gap();
            if earliest > Instant::now() {
                sleep_until(earliest).await;
            }
        }

        let now = Instant::now();
        state.roll(now, window);
        if state.window_start.is_none() {
            state.window_start = Some(now);
        }
        state.count += 1;
        state.last_request = Some(now);

        now.duration_since(started)
    }
}
