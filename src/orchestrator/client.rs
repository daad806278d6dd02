//! Quota-aware, retrying wrapper around a [`GenerationBackend`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, BackendErrorCode, GenerationBackend, GenerationOptions};
use crate::error::GenerationError;

use super::prompt::SystemPrompt;
use super::quota::{QuotaGate, QuotaPolicy, QuotaState};
use super::retry::{RetryPolicy, RetrySchedule};

// ─────────────────────────────────────────────────────────────────
// Outcome & Stats
// ─────────────────────────────────────────────────────────────────

/// Successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    /// Backend calls spent, including the successful one
    pub attempts: u32,
}

/// Counters since the orchestrator was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub requests: u64,
    pub attempts: u64,
    pub retries: u64,
    pub throttle_waits: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    throttle_waits: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            requests: self.requests.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            throttle_waits: self.throttle_waits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────

/// Throttles, bounds and retries calls to one backend instance.
///
/// Quota state is scoped to this instance: sessions sharing an orchestrator
/// share its throttle, separate orchestrators never block each other.
pub struct RequestOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    gate: QuotaGate,
    retry: RetryPolicy,
    options: GenerationOptions,
    counters: Counters,
}

impl RequestOrchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        quota: QuotaPolicy,
        retry: RetryPolicy,
        options: GenerationOptions,
    ) -> Self {
        info!(
            backend = backend.name(),
            max_requests = quota.max_requests,
            window_secs = quota.window_secs,
            max_attempts = retry.max_attempts,
            "Request orchestrator created"
        );
        Self {
            backend,
            gate: QuotaGate::new(quota),
            retry,
            options,
            counters: Counters::default(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.counters.snapshot()
    }

    pub async fn quota_state(&self) -> QuotaState {
        self.gate.snapshot().await
    }

    /// Generate a reply. Always resolves to a typed outcome.
    pub async fn generate(
        &self,
        prompt: &SystemPrompt,
        user_text: &str,
    ) -> Result<Generated, GenerationError> {
        Counters::bump(&self.counters.requests);
        let system_prompt = prompt.render();
        debug!(fingerprint = %prompt.fingerprint(), "System prompt prepared");

        let result = self.run_attempts(&system_prompt, user_text).await;
        if let Err(ref e) = result {
            Counters::bump(&self.counters.failures);
            warn!(kind = %e.kind(), attempts = e.attempts(), "Generation failed");
        }
        result
    }

    async fn run_attempts(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<Generated, GenerationError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut schedule = RetrySchedule::new(&self.retry);
        let mut last_error = BackendError::unknown("no attempt made");

        for attempt in 1..=max_attempts {
            let waited = self.gate.acquire().await;
            if !waited.is_zero() {
                Counters::bump(&self.counters.throttle_waits);
                debug!(attempt, waited_ms = waited.as_millis() as u64, "Throttled");
            }
            Counters::bump(&self.counters.attempts);

            match self.attempt(system_prompt, user_text).await {
                Ok(text) if text.trim().is_empty() => return Err(GenerationError::EmptyResponse),
                Ok(text) => {
                    info!(backend = self.backend.name(), attempts = attempt, "Generation succeeded");
                    return Ok(Generated {
                        text,
                        attempts: attempt,
                    });
                }
                Err(e) if !RetryPolicy::is_retryable(e.code) => return Err(classify(e, attempt)),
                Err(e) => {
                    warn!(attempt, code = ?e.code, error = %e.message, "Retryable generation error");
                    last_error = e;
                }
            }

            if attempt < max_attempts {
                let delay = schedule.next_delay();
                Counters::bump(&self.counters.retries);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                sleep(delay).await;
            }
        }

        Err(classify(last_error, max_attempts))
    }

    async fn attempt(&self, system_prompt: &str, user_text: &str) -> Result<String, BackendError> {
        let bound: Duration = self.retry.attempt_timeout();
        match timeout(bound, self.backend.generate(system_prompt, user_text, &self.options)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::network(format!(
                "attempt timed out after {}ms",
                bound.as_millis()
            ))),
        }
    }
}

fn classify(error: BackendError, attempts: u32) -> GenerationError {
    match error.code {
        BackendErrorCode::QuotaExceeded => GenerationError::QuotaExceeded { attempts },
        BackendErrorCode::NetworkError => GenerationError::Network {
            message: error.message,
            attempts,
        },
        BackendErrorCode::AuthInvalid => GenerationError::AuthInvalid {
            message: error.message,
        },
        BackendErrorCode::Unknown => GenerationError::Unknown {
            message: error.message,
        },
    }
}
