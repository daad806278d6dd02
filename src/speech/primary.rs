//! Primary network voice service.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::persona::VoiceProfile;

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Failure class of a primary synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceErrorKind {
    Auth,
    Quota,
    Network,
    Decode,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceError {
    pub kind: VoiceErrorKind,
    pub message: String,
}

impl VoiceError {
    pub fn new(kind: VoiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for VoiceError {}

/// Network text-to-speech service.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize `text` with the given voice. Returns encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> std::result::Result<Vec<u8>, VoiceError>;
}

// ─────────────────────────────────────────────────────────────────
// ElevenLabs
// ─────────────────────────────────────────────────────────────────

/// Configuration for the ElevenLabs text-to-speech API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
    pub timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            api_key: String::new(),
            model_id: "eleven_multilingual_v2".to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Serialize)]
struct VoiceSettingsBody {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

#[derive(Debug, Serialize)]
struct TextToSpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettingsBody,
}

pub struct ElevenLabsVoice {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabsVoice {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        info!(base_url = %config.base_url, model = %config.model_id, "ElevenLabs voice created");
        Ok(Self { config, client })
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        )
    }
}

#[async_trait]
impl VoiceBackend for ElevenLabsVoice {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> std::result::Result<Vec<u8>, VoiceError> {
        let body = TextToSpeechBody {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettingsBody {
                stability: voice.stability,
                similarity_boost: voice.similarity_boost,
                style: voice.style,
                use_speaker_boost: voice.use_speaker_boost,
            },
        };

        let response = self
            .client
            .post(self.endpoint(&voice.voice_id))
            .header(XI_API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() || e.is_connect() || e.is_request() {
                    VoiceErrorKind::Network
                } else {
                    VoiceErrorKind::Unknown
                };
                VoiceError::new(kind, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, "Voice API error");
            let kind = match status.as_u16() {
                401 | 403 => VoiceErrorKind::Auth,
                429 => VoiceErrorKind::Quota,
                500..=599 => VoiceErrorKind::Network,
                _ => VoiceErrorKind::Unknown,
            };
            return Err(VoiceError::new(kind, format!("API error {}: {}", status, detail)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::new(VoiceErrorKind::Decode, e.to_string()))?;
        debug!(bytes = bytes.len(), voice = %voice.voice_id, "Voice audio received");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let voice = ElevenLabsVoice::new(ElevenLabsConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(voice.endpoint("abc"), "http://localhost:9000/v1/text-to-speech/abc");
    }

    #[test]
    fn test_body_serialization() {
        let body = TextToSpeechBody {
            text: "hi",
            model_id: "m",
            voice_settings: VoiceSettingsBody {
                stability: 0.5,
                similarity_boost: 0.75,
                style: 0.0,
                use_speaker_boost: true,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }
}
