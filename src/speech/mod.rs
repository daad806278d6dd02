//! Speech synthesis with a primary network voice and a local fallback.
//!
//! The cascade owns transient audio resources and guarantees each one is
//! released exactly once, whether the job completes, fails or is stopped.

mod audio;
mod cascade;
mod local;
mod primary;
mod sanitize;
mod types;

pub use audio::{AudioClip, AudioPlayer, AudioResources, CommandPlayer};
pub use cascade::{SpeechCascade, SpeechJobHandle, DEFAULT_MAX_CHARS};
pub use local::{find_program, CommandSynthesizer, LocalSynthesizer};
pub use primary::{ElevenLabsConfig, ElevenLabsVoice, VoiceBackend, VoiceError, VoiceErrorKind};
pub use sanitize::sanitize;
pub use types::{SpeechOutcome, SpeechRequest, SpeechState, SpeechTier};
