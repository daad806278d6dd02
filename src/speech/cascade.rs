//! Speech fallback cascade.
//!
//! One job runs `Idle -> RequestingPrimary -> {Playing | FallingBack} ->
//! {Playing | Failed} -> Done`. Every transition is taken under the job lock
//! and refused once the job is stopped, so a late primary result after
//! `stop()` is discarded. A cascade keeps at most one live job: starting a
//! new one stops and releases the previous one first.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SpeechError;
use crate::persona::{PersonaId, PersonaRegistry};

use super::audio::{AudioClip, AudioPlayer, AudioResources};
use super::local::LocalSynthesizer;
use super::primary::VoiceBackend;
use super::sanitize::sanitize;
use super::types::{SpeechOutcome, SpeechRequest, SpeechState, SpeechTier};

/// Default maximum characters sent to a voice engine.
pub const DEFAULT_MAX_CHARS: usize = 1_000;

// ─────────────────────────────────────────────────────────────────
// Job State
// ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct JobInner {
    state: SpeechState,
    history: Vec<SpeechState>,
    clip: Option<Arc<AudioClip>>,
}

#[derive(Debug)]
struct JobShared {
    id: Uuid,
    inner: Mutex<JobInner>,
    cancel: CancellationToken,
    outcome: watch::Sender<Option<SpeechOutcome>>,
}

impl JobShared {
    fn is_open(&self, inner: &JobInner) -> bool {
        !self.cancel.is_cancelled() && !inner.state.is_terminal()
    }

    /// Move to a non-terminal state. False if the job is stopped or over.
    fn advance(&self, to: SpeechState) -> bool {
        let mut inner = self.inner.lock();
        if !self.is_open(&inner) {
            return false;
        }
        inner.state = to;
        inner.history.push(to);
        debug!(job = %self.id, state = %to, "Speech job transition");
        true
    }

    /// Attach a fresh clip and enter `Playing`. Releases the clip instead if
    /// the job was stopped meanwhile.
    fn start_playing(&self, clip: Arc<AudioClip>) -> bool {
        let mut inner = self.inner.lock();
        if !self.is_open(&inner) {
            drop(inner);
            if let Err(e) = clip.release() {
                warn!(job = %self.id, error = %e, "Discarded clip release failed");
            }
            return false;
        }
        inner.clip = Some(clip);
        inner.state = SpeechState::Playing;
        inner.history.push(SpeechState::Playing);
        debug!(job = %self.id, "Speech job playing primary audio");
        true
    }

    /// Release the current clip, if any, while the job stays open.
    fn drop_clip(&self) {
        let clip = self.inner.lock().clip.take();
        if let Some(clip) = clip {
            if let Err(e) = clip.release() {
                warn!(job = %self.id, error = %e, "Clip release failed");
            }
        }
    }

    /// Enter a terminal state, release resources and publish the outcome.
    fn finish(&self, state: SpeechState, outcome: SpeechOutcome) {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() || (self.cancel.is_cancelled() && outcome != SpeechOutcome::Stopped) {
            return;
        }
        if let Some(clip) = inner.clip.take() {
            if let Err(e) = clip.release() {
                warn!(job = %self.id, error = %e, "Clip release failed");
            }
        }
        inner.state = state;
        inner.history.push(state);
        self.outcome.send_replace(Some(outcome));
        debug!(job = %self.id, state = %state, "Speech job finished");
    }
}

// ─────────────────────────────────────────────────────────────────
// Job Handle
// ─────────────────────────────────────────────────────────────────

/// Caller's view of a running speech job. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SpeechJobHandle {
    shared: Arc<JobShared>,
    outcome: watch::Receiver<Option<SpeechOutcome>>,
}

impl SpeechJobHandle {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> SpeechState {
        self.shared.inner.lock().state
    }

    /// Every state the job has been in, in order.
    pub fn history(&self) -> Vec<SpeechState> {
        self.shared.inner.lock().history.clone()
    }

    /// Whether an audio clip is currently attached.
    pub fn has_clip(&self) -> bool {
        self.shared.inner.lock().clip.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Stop the job now. No further transitions happen after this returns,
    /// and any attached clip is already released.
    pub fn stop(&self) {
        let shared = &self.shared;
        {
            let inner = shared.inner.lock();
            if inner.state.is_terminal() {
                return;
            }
            shared.cancel.cancel();
        }
        shared.finish(SpeechState::Done, SpeechOutcome::Stopped);
        info!(job = %shared.id, "Speech job stopped");
    }

    /// Wait for the job to end.
    pub async fn wait(&self) -> SpeechOutcome {
        let mut rx = self.outcome.clone();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(SpeechOutcome::Stopped),
            // Sender lives in `shared`, which we hold
            Err(_) => SpeechOutcome::Stopped,
        };
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────
// Cascade
// ─────────────────────────────────────────────────────────────────

/// Primary network voice with local fallback, one live job at a time.
pub struct SpeechCascade {
    primary: Option<Arc<dyn VoiceBackend>>,
    local: Option<Arc<dyn LocalSynthesizer>>,
    player: Arc<dyn AudioPlayer>,
    registry: Arc<PersonaRegistry>,
    resources: AudioResources,
    max_chars: usize,
    current: Mutex<Option<SpeechJobHandle>>,
}

impl SpeechCascade {
    pub fn new(
        primary: Option<Arc<dyn VoiceBackend>>,
        local: Option<Arc<dyn LocalSynthesizer>>,
        player: Arc<dyn AudioPlayer>,
        registry: Arc<PersonaRegistry>,
    ) -> Self {
        Self {
            primary,
            local,
            player,
            registry,
            resources: AudioResources::new(),
            max_chars: DEFAULT_MAX_CHARS,
            current: Mutex::new(None),
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(4);
        self
    }

    pub fn resources(&self) -> &AudioResources {
        &self.resources
    }

    /// The live job, if one is running.
    pub fn current(&self) -> Option<SpeechJobHandle> {
        self.current
            .lock()
            .as_ref()
            .filter(|h| !h.is_finished())
            .cloned()
    }

    /// Stop the live job, if any.
    pub fn stop_current(&self) {
        let previous = self.current.lock().take();
        if let Some(job) = previous {
            job.stop();
        }
    }

    /// Start speaking `text`. Returns immediately with a job handle.
    ///
    /// Text that sanitizes to nothing is rejected before any service call.
    /// Must be called inside a Tokio runtime.
    pub fn start(
        &self,
        text: &str,
        persona: PersonaId,
        language: &str,
    ) -> Result<SpeechJobHandle, SpeechError> {
        let text = sanitize(text, self.max_chars).ok_or(SpeechError::EmptyText)?;
        let request = SpeechRequest {
            text,
            persona,
            language: language.to_string(),
        };

        let (tx, rx) = watch::channel(None);
        let shared = Arc::new(JobShared {
            id: Uuid::new_v4(),
            inner: Mutex::new(JobInner {
                state: SpeechState::Idle,
                history: vec![SpeechState::Idle],
                clip: None,
            }),
            cancel: CancellationToken::new(),
            outcome: tx,
        });
        let handle = SpeechJobHandle {
            shared: shared.clone(),
            outcome: rx,
        };

        {
            let mut current = self.current.lock();
            if let Some(previous) = current.take() {
                previous.stop();
            }
            *current = Some(handle.clone());
        }

        info!(job = %shared.id, persona = %persona.slug(), chars = request.text.len(), "Speech job started");
        let worker = JobWorker {
            shared,
            request,
            primary: self.primary.clone(),
            local: self.local.clone(),
            player: self.player.clone(),
            registry: self.registry.clone(),
            resources: self.resources.clone(),
        };
        tokio::spawn(worker.run());

        Ok(handle)
    }
}

impl Drop for SpeechCascade {
    fn drop(&mut self) {
        self.stop_current();
    }
}

// ─────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────

struct JobWorker {
    shared: Arc<JobShared>,
    request: SpeechRequest,
    primary: Option<Arc<dyn VoiceBackend>>,
    local: Option<Arc<dyn LocalSynthesizer>>,
    player: Arc<dyn AudioPlayer>,
    registry: Arc<PersonaRegistry>,
    resources: AudioResources,
}

impl JobWorker {
    async fn run(self) {
        if !self.shared.advance(SpeechState::RequestingPrimary) {
            return;
        }

        let reason = match self.try_primary().await {
            PrimaryResult::Finished | PrimaryResult::Cancelled => return,
            PrimaryResult::Failed(reason) => reason,
        };

        warn!(job = %self.shared.id, reason = %reason, "Primary voice failed, falling back");
        self.fall_back(reason).await;
    }

    async fn try_primary(&self) -> PrimaryResult {
        let Some(ref primary) = self.primary else {
            return PrimaryResult::Failed("no primary voice configured".to_string());
        };
        let cancel = self.shared.cancel.clone();
        let voice = &self.registry.profile(self.request.persona).voice;

        let result = tokio::select! {
            () = cancel.cancelled() => return PrimaryResult::Cancelled,
            r = primary.synthesize(&self.request.text, voice) => r,
        };
        let bytes = match result {
            Ok(bytes) if bytes.is_empty() => {
                return PrimaryResult::Failed("primary returned an empty audio payload".to_string())
            }
            Ok(bytes) => bytes,
            Err(e) => return PrimaryResult::Failed(format!("primary voice: {}", e)),
        };

        let clip = match AudioClip::from_bytes(&bytes, &self.resources) {
            Ok(clip) => Arc::new(clip),
            Err(e) => return PrimaryResult::Failed(e.to_string()),
        };
        let path = match clip.path() {
            Ok(path) => path,
            Err(e) => return PrimaryResult::Failed(e.to_string()),
        };
        if !self.shared.start_playing(clip) {
            return PrimaryResult::Cancelled;
        }

        match self.player.play(&path, cancel.clone()).await {
            _ if cancel.is_cancelled() => PrimaryResult::Cancelled,
            Ok(()) => {
                self.shared.finish(
                    SpeechState::Done,
                    SpeechOutcome::Completed {
                        tier: SpeechTier::Primary,
                    },
                );
                PrimaryResult::Finished
            }
            Err(e) => {
                // Playback error: one retry through the local tier
                self.shared.drop_clip();
                PrimaryResult::Failed(format!("playback: {}", e))
            }
        }
    }

    async fn fall_back(&self, reason: String) {
        if !self.shared.advance(SpeechState::FallingBack) {
            return;
        }

        let local = match self.local {
            Some(ref local) if local.is_available() => local.clone(),
            _ => {
                self.shared.finish(
                    SpeechState::Failed,
                    SpeechOutcome::Failed(SpeechError::NoLocalSynthesizer { reason }),
                );
                return;
            }
        };

        if !self.shared.advance(SpeechState::Playing) {
            return;
        }
        let prosody = self.registry.profile(self.request.persona).prosody;
        let cancel = self.shared.cancel.clone();
        let result = local
            .speak(&self.request.text, &prosody, &self.request.language, cancel.clone())
            .await;
        if cancel.is_cancelled() {
            return;
        }

        match result {
            Ok(()) => self.shared.finish(
                SpeechState::Done,
                SpeechOutcome::Completed {
                    tier: SpeechTier::Local,
                },
            ),
            Err(e) => self.shared.finish(
                SpeechState::Failed,
                SpeechOutcome::Failed(SpeechError::AllTiersFailed {
                    reason: format!("{}; local: {}", reason, e),
                }),
            ),
        }
    }
}

enum PrimaryResult {
    Finished,
    Cancelled,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::CommandPlayer;

    fn cascade() -> SpeechCascade {
        SpeechCascade::new(
            None,
            None,
            Arc::new(CommandPlayer::default()),
            Arc::new(PersonaRegistry::builtin()),
        )
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_any_job() {
        let cascade = cascade();
        assert_eq!(
            cascade.start("  🔥 ** ", PersonaId::Calm, "en").unwrap_err(),
            SpeechError::EmptyText
        );
        assert!(cascade.current().is_none());
    }

    #[tokio::test]
    async fn test_no_tiers_fails_without_local() {
        let cascade = cascade();
        let job = cascade.start("hello", PersonaId::Calm, "en").unwrap();
        let outcome = job.wait().await;
        assert!(matches!(
            outcome,
            SpeechOutcome::Failed(SpeechError::NoLocalSynthesizer { .. })
        ));
        assert_eq!(
            job.history(),
            vec![
                SpeechState::Idle,
                SpeechState::RequestingPrimary,
                SpeechState::FallingBack,
                SpeechState::Failed
            ]
        );
        assert_eq!(cascade.resources().live(), 0);
    }

    #[tokio::test]
    async fn test_stop_after_finish_is_noop() {
        let cascade = cascade();
        let job = cascade.start("hello", PersonaId::Calm, "en").unwrap();
        job.wait().await;
        job.stop();
        assert_eq!(job.state(), SpeechState::Failed);
    }
}
