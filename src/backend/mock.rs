//! Mock backend for testing
//!
//! Provides a scripted implementation of GenerationBackend for unit tests,
//! integration tests and the CLI `--mock` mode.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::time::Duration;

use super::{BackendError, GenerationBackend, GenerationOptions};

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock backend behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Simulated latency per call
    pub latency: Duration,

    /// Returned once the script is exhausted
    pub fallback: Result<String, BackendError>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            fallback: Ok("Here's what I found for you.".to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of GenerationBackend for testing
pub struct MockBackend {
    config: MockConfig,
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    calls: RwLock<u32>,
    last_system_prompt: RwLock<Option<String>>,
}

impl MockBackend {
    /// Create a new mock backend that always succeeds
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock backend with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
            calls: RwLock::new(0),
            last_system_prompt: RwLock::new(None),
        }
    }

    /// Always return `text`
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            fallback: Ok(text.into()),
            ..Default::default()
        })
    }

    /// Always fail with `error`
    pub fn failing(error: BackendError) -> Self {
        Self::with_config(MockConfig {
            fallback: Err(error),
            ..Default::default()
        })
    }

    /// Queue results to return before the fallback, in order
    pub fn with_script(self, results: impl IntoIterator<Item = Result<String, BackendError>>) -> Self {
        self.script.lock().extend(results);
        self
    }

    /// Simulated latency per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.config.latency = latency;
        self
    }

    /// Number of generate calls so far
    pub fn call_count(&self) -> u32 {
        *self.calls.read()
    }

    /// System prompt of the most recent call
    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_system_prompt.read().clone()
    }

    /// Reset the call count
    pub fn reset_counts(&self) {
        *self.calls.write() = 0;
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        _user_text: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        *self.calls.write() += 1;
        *self.last_system_prompt.write() = Some(system_prompt.to_string());

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.config.fallback.clone())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_reply() {
        let backend = MockBackend::new();
        let text = backend
            .generate("sys", "hi", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(!text.is_empty());
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.last_system_prompt().as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn test_mock_script_then_fallback() {
        let backend = MockBackend::replying("done")
            .with_script([Err(BackendError::quota("slow down")), Ok(String::new())]);
        let opts = GenerationOptions::default();

        assert!(backend.generate("s", "u", &opts).await.is_err());
        assert_eq!(backend.generate("s", "u", &opts).await.unwrap(), "");
        assert_eq!(backend.generate("s", "u", &opts).await.unwrap(), "done");
        assert_eq!(backend.call_count(), 3);

        backend.reset_counts();
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let backend = MockBackend::failing(BackendError::auth("bad key"));
        let err = backend
            .generate("s", "u", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, super::super::BackendErrorCode::AuthInvalid);
    }
}
