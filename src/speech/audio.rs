//! Transient audio resources and playback.
//!
//! Audio from the primary voice service is written to a temporary file that
//! lives exactly as long as its speech job. Each clip is released once;
//! releasing twice or touching a released clip is reported as an error.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SpeechError;

// ─────────────────────────────────────────────────────────────────
// Resource Accounting
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ResourceCounts {
    live: AtomicUsize,
    created: AtomicUsize,
    released: AtomicUsize,
}

/// Shared counters for clips created through one cascade.
#[derive(Debug, Clone, Default)]
pub struct AudioResources {
    counts: Arc<ResourceCounts>,
}

impl AudioResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips created but not yet released.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.counts.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counts.released.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────
// Audio Clip
// ─────────────────────────────────────────────────────────────────

/// A temporary audio file owned by one speech job.
#[derive(Debug)]
pub struct AudioClip {
    id: String,
    path: Mutex<Option<TempPath>>,
    resources: AudioResources,
}

impl AudioClip {
    /// Write `bytes` to a fresh temporary file.
    pub fn from_bytes(bytes: &[u8], resources: &AudioResources) -> Result<Self, SpeechError> {
        let mut file = tempfile::Builder::new()
            .prefix("persona-speech-")
            .suffix(".mp3")
            .tempfile()
            .map_err(|e| SpeechError::AudioResource {
                message: format!("failed to create temp file: {}", e),
            })?;
        file.write_all(bytes).map_err(|e| SpeechError::AudioResource {
            message: format!("failed to write audio: {}", e),
        })?;

        let id = Uuid::new_v4().to_string();
        resources.counts.live.fetch_add(1, Ordering::SeqCst);
        resources.counts.created.fetch_add(1, Ordering::SeqCst);
        debug!(clip = %id, bytes = bytes.len(), "Audio clip created");

        Ok(Self {
            id,
            path: Mutex::new(Some(file.into_temp_path())),
            resources: resources.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_released(&self) -> bool {
        self.path.lock().is_none()
    }

    /// Path of the backing file while the clip is live.
    pub fn path(&self) -> Result<PathBuf, SpeechError> {
        self.path
            .lock()
            .as_ref()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| SpeechError::UseAfterRelease {
                id: self.id.clone(),
            })
    }

    /// Delete the backing file. A second call is an error.
    pub fn release(&self) -> Result<(), SpeechError> {
        let taken = self.path.lock().take();
        let Some(temp) = taken else {
            return Err(SpeechError::AlreadyReleased {
                id: self.id.clone(),
            });
        };

        self.resources.counts.live.fetch_sub(1, Ordering::SeqCst);
        self.resources.counts.released.fetch_add(1, Ordering::SeqCst);
        debug!(clip = %self.id, "Audio clip released");

        temp.close().map_err(|e| SpeechError::AudioResource {
            message: format!("failed to delete {}: {}", self.id, e),
        })
    }
}

impl Drop for AudioClip {
    fn drop(&mut self) {
        if !self.is_released() {
            if let Err(e) = self.release() {
                warn!(clip = %self.id, error = %e, "Audio clip release on drop failed");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────

/// Plays an audio file to completion or until cancelled.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve when playback ends. Cancellation must stop output promptly
    /// and resolve with `Ok`.
    async fn play(&self, path: &Path, cancel: CancellationToken) -> Result<(), String>;
}

/// Plays through an external program such as `mpg123` or `ffplay`.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new("mpg123", vec!["-q".to_string()])
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn play(&self, path: &Path, cancel: CancellationToken) -> Result<(), String> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.program, e))?;
        wait_or_kill(child, &self.program, cancel).await
    }
}

/// Wait for `child`, killing it if `cancel` fires first.
pub(crate) async fn wait_or_kill(
    mut child: tokio::process::Child,
    program: &str,
    cancel: CancellationToken,
) -> Result<(), String> {
    tokio::select! {
        () = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                warn!(program, error = %e, "Failed to kill process on cancel");
            }
            Ok(())
        }
        status = child.wait() => {
            let status = status.map_err(|e| format!("{} failed: {}", program, e))?;
            if status.success() {
                Ok(())
            } else {
                Err(format!("{} exited with {}", program, status))
            }
        }
    }
}
