//! Local/offline speech synthesis.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::persona::Prosody;

use super::audio::wait_or_kill;

/// Speaks text directly on the local machine.
#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the synthesizer can run here at all.
    fn is_available(&self) -> bool;

    /// Speak to completion. Cancellation stops output and resolves `Ok`.
    async fn speak(
        &self,
        text: &str,
        prosody: &Prosody,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<(), String>;
}

/// Drives an espeak-compatible program (`espeak-ng`, `espeak`).
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    /// espeak's default speaking rate in words per minute.
    const BASE_WPM: f32 = 175.0;

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for the given prosody and language.
    pub fn args(&self, text: &str, prosody: &Prosody, language: &str) -> Vec<String> {
        let wpm = (Self::BASE_WPM * prosody.rate).round().clamp(80.0, 450.0) as u32;
        let pitch = (50.0 * prosody.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (100.0 * prosody.volume).round().clamp(0.0, 200.0) as u32;
        vec![
            "-v".to_string(),
            language.to_string(),
            "-s".to_string(),
            wpm.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "--".to_string(),
            text.to_string(),
        ]
    }
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

/// Resolve `program` against PATH, or check it directly if it has a separator.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl LocalSynthesizer for CommandSynthesizer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_available(&self) -> bool {
        find_program(&self.program).is_some()
    }

    async fn speak(
        &self,
        text: &str,
        prosody: &Prosody,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<(), String> {
        let args = self.args(text, prosody, language);
        debug!(program = %self.program, rate = prosody.rate, pitch = prosody.pitch, "Local synthesis");
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.program, e))?;
        wait_or_kill(child, &self.program, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_prosody() {
        let synth = CommandSynthesizer::default();
        let args = synth.args(
            "hello",
            &Prosody {
                rate: 0.8,
                pitch: 1.2,
                volume: 0.9,
            },
            "en",
        );
        assert_eq!(
            args,
            vec!["-v", "en", "-s", "140", "-p", "60", "-a", "90", "--", "hello"]
        );
    }

    #[test]
    fn test_args_are_clamped() {
        let synth = CommandSynthesizer::default();
        let args = synth.args(
            "x",
            &Prosody {
                rate: 4.0,
                pitch: 4.0,
                volume: 1.0,
            },
            "en",
        );
        assert_eq!(args[3], "450");
        assert_eq!(args[5], "99");
    }

    #[test]
    fn test_missing_program_unavailable() {
        let synth = CommandSynthesizer::new("no-such-speech-engine-xyz");
        assert!(!synth.is_available());
        assert!(find_program("/no/such/dir/espeak").is_none());
    }
}
