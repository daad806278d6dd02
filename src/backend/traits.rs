//! Backend trait definitions
//!
//! Defines the GenerationBackend trait the orchestrator drives, and the raw
//! error shape backends report before classification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────
// Options & Errors
// ─────────────────────────────────────────────────────────────────

/// Sampling options passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 400,
        }
    }
}

/// Error codes a backend may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorCode {
    AuthInvalid,
    QuotaExceeded,
    NetworkError,
    Unknown,
}

/// Raw failure from one backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub code: BackendErrorCode,
    pub message: String,
}

impl BackendError {
    pub fn new(code: BackendErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::QuotaExceeded, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::AuthInvalid, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorCode::Unknown, message)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for BackendError {}

// ─────────────────────────────────────────────────────────────────
// GenerationBackend Trait
// ─────────────────────────────────────────────────────────────────

/// External text-generation service
///
/// Implementations make exactly one attempt per call; throttling, retries
/// and timeouts belong to the orchestrator. An empty string is a valid
/// return here and is classified by the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get the name of this backend
    fn name(&self) -> &'static str;

    /// Generate a reply for `user_text` under `system_prompt`
    async fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;
}
