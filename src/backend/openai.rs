//! OpenAI-compatible API backend
//!
//! Implements GenerationBackend by making HTTP calls to any OpenAI-compatible
//! chat-completions endpoint (OpenAI, Ollama, vLLM, LM Studio, etc.).

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::{BackendError, GenerationBackend, GenerationOptions};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for OpenAI-compatible API backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o-mini", "llama3")
    pub model: String,

    /// Transport timeout in seconds. The orchestrator applies its own
    /// per-attempt bound on top of this.
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: String::new(),
            model: "llama3".to_string(),
            timeout_secs: 60,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

/// Map a non-success HTTP status to a backend error code.
pub fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let message = format!("API error {}: {}", status, body);
    match status.as_u16() {
        401 | 403 => BackendError::auth(message),
        429 => BackendError::quota(message),
        500..=599 => BackendError::network(message),
        _ => BackendError::unknown(message),
    }
}

fn classify_transport(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        BackendError::network(format!("Connection error: {}", e))
    } else {
        BackendError::unknown(format!("Request error: {}", e))
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible chat-completions backend
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
    total_requests: RwLock<u64>,
    total_tokens: RwLock<u64>,
}

impl OpenAiBackend {
    /// Create a new OpenAI backend with the given configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            "OpenAI-compatible backend created"
        );

        Ok(Self {
            config,
            client,
            total_requests: RwLock::new(0),
            total_tokens: RwLock::new(0),
        })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Successful requests so far
    pub fn total_requests(&self) -> u64 {
        *self.total_requests.read()
    }

    /// Tokens reported by the API so far
    pub fn total_tokens(&self) -> u64 {
        *self.total_tokens.read()
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_text: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, BackendError> {
        let request_body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let mut req = self.client.post(self.endpoint()).json(&request_body);
        if let Some(ref auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await.map_err(|e| {
            warn!(error = %e, "Generation request failed");
            classify_transport(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Generation API error");
            return Err(classify_status(status, &body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::unknown(format!("Failed to parse API response: {}", e)))?;

        *self.total_requests.write() += 1;
        if let Some(u) = parsed.usage {
            *self.total_tokens.write() += u.total_tokens as u64;
        }

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(chars = text.len(), "Generation response received");
        Ok(text)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
