//! Caller-facing engine: detection, orchestrated generation, rendering and
//! speech wired together.
//!
//! One [`PersonaEngine`] can serve many sessions; each session owns its own
//! [`ConversationStateTracker`]. Sessions that share an engine share its
//! generation quota.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::backend::{GenerationBackend, GenerationOptions, OpenAiBackend};
use crate::config::EngineConfig;
use crate::detection::{ExtractorThresholds, PersonaDetector, ScoringWeights, UserProfile};
use crate::error::{GenerationError, GenerationErrorKind, Result, SpeechError};
use crate::orchestrator::{OrchestratorStats, PromptBuilder, QuotaPolicy, RequestOrchestrator, RetryPolicy};
use crate::persona::{PersonaCatalog, PersonaId, PersonaRegistry};
use crate::render::{LocalResponder, ResponseRenderer};
use crate::session::{ConversationStateTracker, TransitionTemplates};
use crate::speech::{
    AudioPlayer, CommandPlayer, CommandSynthesizer, ElevenLabsVoice, LocalSynthesizer, SpeechCascade,
    SpeechJobHandle, VoiceBackend, DEFAULT_MAX_CHARS,
};

/// Stand-in user message for empty input.
pub const DEFAULT_GREETING: &str = "Hello! Please introduce yourself briefly and ask how you can help.";

// ─────────────────────────────────────────────────────────────────
// Reply
// ─────────────────────────────────────────────────────────────────

/// Where the reply text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReplySource {
    /// The generation backend answered
    Generated { attempts: u32 },
    /// Local phrase bank; `reason` is `None` when no backend is configured
    LocalFallback {
        #[serde(serialize_with = "serialize_reason")]
        reason: Option<GenerationError>,
    },
}

fn serialize_reason<S: Serializer>(reason: &Option<GenerationError>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match reason {
        Some(e) => s.serialize_some(&e.kind().to_string()),
        None => s.serialize_none(),
    }
}

impl ReplySource {
    pub fn is_generated(&self) -> bool {
        matches!(self, ReplySource::Generated { .. })
    }

    /// Failure class behind a local reply.
    pub fn failure(&self) -> Option<GenerationErrorKind> {
        match self {
            ReplySource::LocalFallback { reason: Some(e) } => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result of one `detect_and_respond` turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineReply {
    pub styled_text: String,
    pub selected_persona: PersonaId,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    pub reasoning: Vec<String>,
    pub source: ReplySource,
}

// ─────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────

/// Assembles a [`PersonaEngine`]. Every part has a working default.
pub struct EngineBuilder {
    registry: Arc<PersonaRegistry>,
    templates: Arc<TransitionTemplates>,
    thresholds: ExtractorThresholds,
    weights: ScoringWeights,
    backend: Option<Arc<dyn GenerationBackend>>,
    quota: QuotaPolicy,
    retry: RetryPolicy,
    options: GenerationOptions,
    voice: Option<Arc<dyn VoiceBackend>>,
    local: Option<Arc<dyn LocalSynthesizer>>,
    player: Arc<dyn AudioPlayer>,
    max_speech_chars: usize,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            registry: Arc::new(PersonaRegistry::builtin()),
            templates: Arc::new(TransitionTemplates::builtin()),
            thresholds: ExtractorThresholds::default(),
            weights: ScoringWeights::default(),
            backend: None,
            quota: QuotaPolicy::default(),
            retry: RetryPolicy::default(),
            options: GenerationOptions::default(),
            voice: None,
            local: None,
            player: Arc::new(CommandPlayer::default()),
            max_speech_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder populated from configuration: OpenAI-compatible backend when
    /// generation is enabled, ElevenLabs when a voice key is set, espeak and
    /// the configured player for local audio, persona overrides from disk.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let catalog = PersonaCatalog::new(config.persona_dir());
        let mut builder = Self::new()
            .registry(PersonaRegistry::with_overrides(&catalog)?)
            .detection(config.detection.thresholds, config.detection.weights.clone())
            .quota(config.quota.clone())
            .retry(config.retry.clone())
            .options(config.generation.options())
            .local_synthesizer(Arc::new(CommandSynthesizer::new(config.speech.local_program.clone())))
            .player(Arc::new(CommandPlayer::new(
                config.speech.player.clone(),
                config.speech.player_args.clone(),
            )))
            .max_speech_chars(config.speech.max_chars);

        if config.generation.enabled {
            let backend = OpenAiBackend::new(config.generation.backend.clone())?;
            builder = builder.backend(Arc::new(backend));
        }

        let speech = &config.speech;
        if speech.primary_enabled && !speech.elevenlabs.api_key.is_empty() {
            let voice = ElevenLabsVoice::new(speech.elevenlabs.clone())?;
            builder = builder.voice(Arc::new(voice));
        }

        Ok(builder)
    }

    pub fn registry(mut self, registry: PersonaRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn templates(mut self, templates: TransitionTemplates) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn detection(mut self, thresholds: ExtractorThresholds, weights: ScoringWeights) -> Self {
        self.thresholds = thresholds;
        self.weights = weights;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Answer every message locally.
    pub fn without_backend(mut self) -> Self {
        self.backend = None;
        self
    }

    pub fn quota(mut self, quota: QuotaPolicy) -> Self {
        self.quota = quota;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn voice(mut self, voice: Arc<dyn VoiceBackend>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn without_voice(mut self) -> Self {
        self.voice = None;
        self
    }

    pub fn local_synthesizer(mut self, local: Arc<dyn LocalSynthesizer>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn player(mut self, player: Arc<dyn AudioPlayer>) -> Self {
        self.player = player;
        self
    }

    pub fn max_speech_chars(mut self, max_chars: usize) -> Self {
        self.max_speech_chars = max_chars;
        self
    }

    pub fn build(self) -> PersonaEngine {
        let detector = PersonaDetector::from_parts(self.thresholds, self.weights, self.templates.clone());
        let orchestrator = self
            .backend
            .map(|backend| RequestOrchestrator::new(backend, self.quota, self.retry, self.options));
        let speech = SpeechCascade::new(self.voice, self.local, self.player, self.registry.clone())
            .with_max_chars(self.max_speech_chars);

        info!(
            backend = orchestrator.as_ref().map(|o| o.backend_name()).unwrap_or("none"),
            "Persona engine ready"
        );

        PersonaEngine {
            registry: self.registry,
            templates: self.templates,
            detector,
            orchestrator,
            renderer: ResponseRenderer::default(),
            responder: LocalResponder::new(),
            speech,
            auth_failure: Mutex::new(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────

pub struct PersonaEngine {
    registry: Arc<PersonaRegistry>,
    templates: Arc<TransitionTemplates>,
    detector: PersonaDetector,
    orchestrator: Option<RequestOrchestrator>,
    renderer: ResponseRenderer,
    responder: LocalResponder,
    speech: SpeechCascade,
    /// Set on the first rejected credential; no backend calls after that
    auth_failure: Mutex<Option<GenerationError>>,
}

impl PersonaEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(EngineBuilder::from_config(config)?.build())
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn detector(&self) -> &PersonaDetector {
        &self.detector
    }

    pub fn speech(&self) -> &SpeechCascade {
        &self.speech
    }

    pub fn has_backend(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn orchestrator_stats(&self) -> Option<OrchestratorStats> {
        self.orchestrator.as_ref().map(RequestOrchestrator::stats)
    }

    /// Fresh per-session state sharing this engine's transition templates.
    pub fn new_session(&self) -> ConversationStateTracker {
        ConversationStateTracker::new(self.templates.clone())
    }

    /// Run one conversational turn.
    ///
    /// Never fails: backend errors become a local reply and the typed error
    /// is kept in [`EngineReply::source`]. The session records the turn when
    /// generation succeeded or when no backend is configured, never after a
    /// backend failure.
    pub async fn detect_and_respond(
        &self,
        text: &str,
        profile: &UserProfile,
        session: &mut ConversationStateTracker,
    ) -> EngineReply {
        let trimmed = text.trim();
        let (detection, enriched) = self.detector.detect(trimmed, profile, session.state());
        debug!(
            persona = %detection.persona.slug(),
            confidence = detection.confidence,
            signals = detection.signals.len(),
            "Persona detected"
        );

        let user_text = if trimmed.is_empty() {
            debug!("Empty input, using default greeting");
            DEFAULT_GREETING
        } else {
            trimmed
        };

        let auth_failure = self.auth_failure.lock().clone();
        let outcome = match (auth_failure, self.orchestrator.as_ref()) {
            (Some(auth), _) => Err(Some(auth)),
            (None, None) => Err(None),
            (None, Some(orchestrator)) => {
                let persona = self.registry.profile(detection.persona);
                let prompt = PromptBuilder::for_persona(persona, &enriched, &detection, session.state()).build();
                orchestrator.generate(&prompt, user_text).await.map_err(Some)
            }
        };

        let (raw, source) = match outcome {
            Ok(generated) => {
                session.record_turn(&detection);
                (
                    generated.text,
                    ReplySource::Generated {
                        attempts: generated.attempts,
                    },
                )
            }
            Err(reason) => {
                // No backend configured: the local reply is the turn
                if reason.is_none() {
                    session.record_turn(&detection);
                }
                if let Some(GenerationError::AuthInvalid { .. }) = reason {
                    let mut failure = self.auth_failure.lock();
                    if failure.is_none() {
                        warn!("Backend rejected credentials, answering locally until reconfigured");
                        *failure = reason.clone();
                    }
                }
                let kind = reason.as_ref().map(GenerationError::kind);
                let reply = self.responder.reply(user_text, detection.persona, kind);
                (reply, ReplySource::LocalFallback { reason })
            }
        };

        EngineReply {
            styled_text: self.renderer.render(&raw, detection.persona),
            selected_persona: detection.persona,
            confidence: detection.confidence,
            transition: detection.transition,
            reasoning: detection.reasoning,
            source,
        }
    }

    /// Start speaking `text` in the persona's voice, stopping any live job.
    pub fn synthesize_speech(
        &self,
        text: &str,
        persona: PersonaId,
        language: &str,
    ) -> std::result::Result<SpeechJobHandle, SpeechError> {
        self.speech.start(text, persona, language)
    }

    pub fn stop_speech(&self) {
        self.speech.stop_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};

    fn fast_quota() -> QuotaPolicy {
        QuotaPolicy {
            min_gap_ms: 0,
            ..Default::default()
        }
    }

    fn engine_with(backend: MockBackend) -> (PersonaEngine, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let engine = PersonaEngine::builder()
            .backend(backend.clone())
            .quota(fast_quota())
            .build();
        (engine, backend)
    }

    #[tokio::test]
    async fn test_generated_reply_is_rendered_and_recorded() {
        let (engine, backend) = engine_with(MockBackend::replying("gonna check that for you"));
        let mut session = engine.new_session();

        let reply = engine
            .detect_and_respond("hey", &UserProfile::pinned(PersonaId::Professional), &mut session)
            .await;

        assert_eq!(reply.selected_persona, PersonaId::Professional);
        assert_eq!(reply.confidence, 100);
        assert_eq!(reply.source, ReplySource::Generated { attempts: 1 });
        assert!(reply.styled_text.contains("Going to check that for you"));
        assert_eq!(session.state().message_count(), 1);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_backend_falls_back_locally() {
        let engine = PersonaEngine::builder().build();
        let mut session = engine.new_session();

        let reply = engine
            .detect_and_respond("thanks so much", &UserProfile::default(), &mut session)
            .await;

        assert_eq!(reply.source, ReplySource::LocalFallback { reason: None });
        assert!(!reply.styled_text.is_empty());
        assert_eq!(session.state().message_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_turns_track_persona_changes() {
        let engine = PersonaEngine::builder().build();
        let mut session = engine.new_session();

        let calm = engine
            .detect_and_respond("so relaxing", &UserProfile::pinned(PersonaId::Calm), &mut session)
            .await;
        assert!(calm.transition.is_none());
        assert_eq!(session.active_persona(), Some(PersonaId::Calm));

        let energetic = engine
            .detect_and_respond("let's go!", &UserProfile::pinned(PersonaId::Energetic), &mut session)
            .await;
        assert_eq!(energetic.source, ReplySource::LocalFallback { reason: None });
        assert!(energetic.transition.is_some());
        assert_eq!(session.state().message_count(), 2);
        assert_eq!(session.state().previous_persona(), Some(PersonaId::Calm));
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_record_turn() {
        let (engine, _) = engine_with(MockBackend::failing(BackendError::unknown("boom")));
        let mut session = engine.new_session();

        let reply = engine
            .detect_and_respond("hello", &UserProfile::pinned(PersonaId::Calm), &mut session)
            .await;

        assert_eq!(reply.source.failure(), Some(GenerationErrorKind::Unknown));
        assert_eq!(session.state().message_count(), 0);
        assert_eq!(session.active_persona(), None);
    }

    #[tokio::test]
    async fn test_empty_input_uses_greeting() {
        let (engine, backend) = engine_with(MockBackend::replying("Hi there"));
        let mut session = engine.new_session();

        let reply = engine
            .detect_and_respond("   ", &UserProfile::default(), &mut session)
            .await;

        assert_eq!(reply.selected_persona, PersonaId::AutoDetect);
        assert!(reply.source.is_generated());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_disables_backend() {
        let (engine, backend) = engine_with(MockBackend::failing(BackendError::auth("bad key")));
        let mut session = engine.new_session();
        let profile = UserProfile::default();

        let first = engine.detect_and_respond("hello", &profile, &mut session).await;
        assert_eq!(first.source.failure(), Some(GenerationErrorKind::AuthInvalid));

        let second = engine.detect_and_respond("hello again", &profile, &mut session).await;
        assert_eq!(second.source.failure(), Some(GenerationErrorKind::AuthInvalid));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transition_announced_on_switch() {
        let (engine, _) = engine_with(MockBackend::replying("Sure thing"));
        let mut session = engine.new_session();

        let first = engine
            .detect_and_respond("x", &UserProfile::pinned(PersonaId::Calm), &mut session)
            .await;
        assert!(first.transition.is_none());

        let same = engine
            .detect_and_respond("y", &UserProfile::pinned(PersonaId::Calm), &mut session)
            .await;
        assert!(same.transition.is_none());

        let switched = engine
            .detect_and_respond("z", &UserProfile::pinned(PersonaId::Energetic), &mut session)
            .await;
        assert!(switched.transition.is_some());
    }

    #[test]
    fn test_reply_source_serializes_kind() {
        let source = ReplySource::LocalFallback {
            reason: Some(GenerationError::QuotaExceeded { attempts: 3 }),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "local-fallback");
        assert_eq!(json["reason"], "quota-exceeded");
    }
}
