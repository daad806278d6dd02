//! Speech job states and outcomes.

use std::fmt;

use serde::Serialize;

use crate::error::SpeechError;
use crate::persona::PersonaId;

/// Where a speech job is in the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechState {
    Idle,
    RequestingPrimary,
    FallingBack,
    Playing,
    Failed,
    Done,
}

impl SpeechState {
    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SpeechState::Failed | SpeechState::Done)
    }
}

impl fmt::Display for SpeechState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpeechState::Idle => "idle",
            SpeechState::RequestingPrimary => "requesting-primary",
            SpeechState::FallingBack => "falling-back",
            SpeechState::Playing => "playing",
            SpeechState::Failed => "failed",
            SpeechState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Which synthesis tier produced the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechTier {
    Primary,
    Local,
}

/// How a speech job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Playback ran to completion.
    Completed { tier: SpeechTier },
    /// Stopped by the caller or superseded by a newer job.
    Stopped,
    /// Every available tier failed.
    Failed(SpeechError),
}

impl SpeechOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SpeechOutcome::Completed { .. })
    }
}

/// Input for one speech job, after sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub persona: PersonaId,
    /// BCP-47 style tag, e.g. "en" or "en-us".
    pub language: String,
}
