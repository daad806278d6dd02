//! Shared test infrastructure: config fixtures, HTTP response bodies and
//! stub speech tiers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use persona_engine::persona::{Prosody, VoiceProfile};
use persona_engine::speech::{AudioPlayer, LocalSynthesizer, VoiceBackend, VoiceError, VoiceErrorKind};

// ─────────────────────────────────────────────────────────────────
// Config Fixtures
// ─────────────────────────────────────────────────────────────────

/// No backend, no voice key, no local synthesizer. `{dir}` is replaced.
pub const OFFLINE_CONFIG: &str = r#"
[generation]
enabled = false

[speech]
primary_enabled = false
local_program = "no-such-synthesizer-for-tests"

[personas]
dir = "{dir}/personas"

[logging]
level = "error"
"#;

/// Soft threshold above the hard limit.
pub const INVALID_CONFIG: &str = r#"
[quota]
max_requests = 5
soft_threshold = 9
"#;

/// Write `template` to `<dir>/persona-engine.toml` and return its path.
pub fn write_config(dir: &Path, template: &str) -> PathBuf {
    let path = dir.join("persona-engine.toml");
    let content = template.replace("{dir}", &dir.to_string_lossy());
    std::fs::write(&path, content).expect("write config fixture");
    path
}

// ─────────────────────────────────────────────────────────────────
// HTTP Fixtures
// ─────────────────────────────────────────────────────────────────

/// Chat-completions success body carrying `text`.
pub fn completion_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }],
        "usage": { "total_tokens": 12 }
    })
}

// ─────────────────────────────────────────────────────────────────
// Speech Stubs
// ─────────────────────────────────────────────────────────────────

/// Primary voice returning a fixed result after an optional delay.
pub struct StubVoice {
    result: Result<Vec<u8>, VoiceError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubVoice {
    pub fn audio(bytes: &[u8]) -> Self {
        Self {
            result: Ok(bytes.to_vec()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::audio(&[])
    }

    pub fn failing(kind: VoiceErrorKind) -> Self {
        Self {
            result: Err(VoiceError::new(kind, "stub failure")),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceBackend for StubVoice {
    fn name(&self) -> &'static str {
        "stub-voice"
    }

    async fn synthesize(&self, _text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

/// Local synthesizer that "speaks" for a fixed duration.
pub struct StubLocal {
    available: bool,
    fail: bool,
    duration: Duration,
    calls: AtomicUsize,
    prosody: Mutex<Option<Prosody>>,
}

impl StubLocal {
    pub fn working() -> Self {
        Self {
            available: true,
            fail: false,
            duration: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
            prosody: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::working()
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prosody(&self) -> Option<Prosody> {
        *self.prosody.lock()
    }
}

#[async_trait]
impl LocalSynthesizer for StubLocal {
    fn name(&self) -> &'static str {
        "stub-local"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn speak(
        &self,
        _text: &str,
        prosody: &Prosody,
        _language: &str,
        cancel: CancellationToken,
    ) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.prosody.lock() = Some(*prosody);
        tokio::select! {
            () = cancel.cancelled() => Ok(()),
            () = tokio::time::sleep(self.duration) => {
                if self.fail {
                    Err("stub local failure".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Player that checks the clip exists, then plays until done or cancelled.
pub struct StubPlayer {
    duration: Duration,
    fail: bool,
    plays: AtomicUsize,
}

impl StubPlayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail: false,
            plays: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::from_millis(5))
        }
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioPlayer for StubPlayer {
    fn name(&self) -> &'static str {
        "stub-player"
    }

    async fn play(&self, path: &Path, cancel: CancellationToken) -> Result<(), String> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(format!("clip missing: {}", path.display()));
        }
        if self.fail {
            return Err("device unavailable".to_string());
        }
        tokio::select! {
            () = cancel.cancelled() => Ok(()),
            () = tokio::time::sleep(self.duration) => Ok(()),
        }
    }
}
