//! Per-session conversation state and its single writer.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::detection::{DetectionResult, Emotion};
use crate::persona::PersonaId;

use super::transitions::TransitionTemplates;

/// Emotional tags kept per session.
pub const EMOTIONAL_CONTEXT_LIMIT: usize = 8;

// ─────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────

/// Persona history for one session. Read-only outside the tracker.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    previous_persona: Option<PersonaId>,
    preferred_persona: Option<PersonaId>,
    message_count: u64,
    emotional_context: VecDeque<Emotion>,
}

impl ConversationState {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            previous_persona: None,
            preferred_persona: None,
            message_count: 0,
            emotional_context: VecDeque::with_capacity(EMOTIONAL_CONTEXT_LIMIT),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Persona that was active before the most recent turn.
    pub fn previous_persona(&self) -> Option<PersonaId> {
        self.previous_persona
    }

    /// Persona selected by the most recent completed turn.
    pub fn preferred_persona(&self) -> Option<PersonaId> {
        self.preferred_persona
    }

    /// Persona in effect for the next turn. `None` before the first turn.
    pub fn active_persona(&self) -> Option<PersonaId> {
        self.preferred_persona
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Most recent emotional tags, oldest first.
    pub fn emotional_context(&self) -> impl Iterator<Item = &Emotion> {
        self.emotional_context.iter()
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tracker
// ─────────────────────────────────────────────────────────────────

/// Owns one session's [`ConversationState`]; the only code that mutates it.
#[derive(Debug, Clone)]
pub struct ConversationStateTracker {
    state: ConversationState,
    templates: Arc<TransitionTemplates>,
}

impl ConversationStateTracker {
    pub fn new(templates: Arc<TransitionTemplates>) -> Self {
        Self {
            state: ConversationState::new(),
            templates,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn active_persona(&self) -> Option<PersonaId> {
        self.state.active_persona()
    }

    /// Announcement for a change from `old` to `new`; `None` when equal.
    pub fn generate_transition(&self, old: PersonaId, new: PersonaId) -> Option<String> {
        self.templates.announce(old, new)
    }

    /// Fold a completed turn into the state.
    ///
    /// Call once per turn, after the response for `result` was produced.
    pub fn record_turn(&mut self, result: &DetectionResult) {
        let state = &mut self.state;
        state.previous_persona = state.preferred_persona;
        state.preferred_persona = Some(result.persona);
        state.message_count += 1;

        for emotion in &result.emotions {
            if state.emotional_context.len() == EMOTIONAL_CONTEXT_LIMIT {
                state.emotional_context.pop_front();
            }
            state.emotional_context.push_back(*emotion);
        }

        debug!(
            session = %state.session_id,
            turn = state.message_count,
            previous = ?state.previous_persona,
            persona = %result.persona.slug(),
            "Turn recorded"
        );
    }

    /// Start over with a fresh session id.
    pub fn reset(&mut self) {
        self.state = ConversationState::new();
    }
}

impl Default for ConversationStateTracker {
    fn default() -> Self {
        Self::new(Arc::new(TransitionTemplates::builtin()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(persona: PersonaId, emotions: Vec<Emotion>) -> DetectionResult {
        DetectionResult {
            persona,
            confidence: 80,
            reasoning: vec![],
            transition: None,
            signals: vec![],
            emotions,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_state() {
        let tracker = ConversationStateTracker::default();
        assert_eq!(tracker.active_persona(), None);
        assert_eq!(tracker.state().message_count(), 0);
        assert_eq!(tracker.state().previous_persona(), None);
    }

    #[test]
    fn test_record_turn_shifts_personas() {
        let mut tracker = ConversationStateTracker::default();
        tracker.record_turn(&result(PersonaId::Calm, vec![]));
        tracker.record_turn(&result(PersonaId::Energetic, vec![]));

        let state = tracker.state();
        assert_eq!(state.previous_persona(), Some(PersonaId::Calm));
        assert_eq!(state.preferred_persona(), Some(PersonaId::Energetic));
        assert_eq!(tracker.active_persona(), Some(PersonaId::Energetic));
        assert_eq!(state.message_count(), 2);
    }

    #[test]
    fn test_emotional_context_is_bounded() {
        let mut tracker = ConversationStateTracker::default();
        for _ in 0..5 {
            tracker.record_turn(&result(
                PersonaId::Caring,
                vec![Emotion::Distress, Emotion::Relaxed],
            ));
        }
        let context: Vec<_> = tracker.state().emotional_context().collect();
        assert_eq!(context.len(), EMOTIONAL_CONTEXT_LIMIT);
        assert_eq!(*context[EMOTIONAL_CONTEXT_LIMIT - 1], Emotion::Relaxed);
    }

    #[test]
    fn test_generate_transition_same_is_none() {
        let tracker = ConversationStateTracker::default();
        assert!(tracker
            .generate_transition(PersonaId::Teen, PersonaId::Teen)
            .is_none());
        assert!(tracker
            .generate_transition(PersonaId::Teen, PersonaId::Calm)
            .is_some());
    }

    #[test]
    fn test_reset_issues_new_session() {
        let mut tracker = ConversationStateTracker::default();
        let first = tracker.state().session_id();
        tracker.record_turn(&result(PersonaId::Calm, vec![]));
        tracker.reset();
        assert_ne!(tracker.state().session_id(), first);
        assert_eq!(tracker.state().message_count(), 0);
    }
}
