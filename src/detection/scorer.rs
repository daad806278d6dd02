//! Persona scoring: turns signals, profile and history into one selection.
//!
//! Every candidate starts at zero and collects fixed weights. The highest
//! score wins, ties go to the first-declared persona, and a best score at or
//! below the threshold falls back to [`PersonaId::AutoDetect`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::persona::PersonaId;
use crate::session::{ConversationState, TransitionTemplates};

use super::profile::{AgeBracket, FamilyComposition, UserProfile};
use super::signals::{emotions_of, Emotion, Signal, SignalSet};

/// Confidence reported for a manually pinned persona.
pub const MANUAL_CONFIDENCE: u8 = 100;
const CONFIDENCE_FLOOR: u32 = 20;
const CONFIDENCE_CEILING: u32 = 95;

// ─────────────────────────────────────────────────────────────────
// Weights
// ─────────────────────────────────────────────────────────────────

/// Hand-tuned scoring constants. Only their relative order is load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub dialect: u32,
    pub infantile: u32,
    pub formal: u32,
    pub youth_slang: u32,
    /// Secondary weight youth slang gives the teen persona.
    pub youth_slang_teen: u32,
    pub distress: u32,
    pub excitement: u32,
    pub high_energy: u32,
    pub relaxed: u32,
    pub verbose: u32,

    pub dialect_region: u32,
    pub teen_age: u32,
    pub teen_age_youth: u32,
    pub young_adult: u32,
    pub child_age: u32,
    pub senior_age: u32,
    pub with_children: u32,
    pub accessibility: u32,

    pub history: u32,
    pub help_request: u32,

    /// Best scores at or below this select the fallback persona.
    pub auto_detect_threshold: u32,

    /// Regions (lowercase substrings) that earn the regional bonus.
    pub dialect_regions: Vec<String>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dialect: 10,
            infantile: 9,
            formal: 7,
            youth_slang: 8,
            youth_slang_teen: 4,
            distress: 9,
            excitement: 6,
            high_energy: 6,
            relaxed: 6,
            verbose: 3,

            dialect_region: 6,
            teen_age: 5,
            teen_age_youth: 4,
            young_adult: 5,
            child_age: 5,
            senior_age: 3,
            with_children: 5,
            accessibility: 6,

            history: 3,
            help_request: 4,

            auto_detect_threshold: 2,

            dialect_regions: [
                "texas", "alabama", "georgia", "louisiana", "tennessee", "kentucky",
                "mississippi", "oklahoma", "scotland", "ireland", "yorkshire", "liverpool",
                "newcastle", "australia", "new zealand", "newfoundland", "boston", "pittsburgh",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ScoringWeights {
    fn signal_weights(&self, signal: Signal) -> Vec<(PersonaId, u32)> {
        match signal {
            Signal::DialectMarker => vec![(PersonaId::Regional, self.dialect)],
            Signal::InfantileSpeech => vec![(PersonaId::KidFriendly, self.infantile)],
            Signal::FormalRegister => vec![(PersonaId::Professional, self.formal)],
            Signal::YouthSlang => vec![
                (PersonaId::YouthDigital, self.youth_slang),
                (PersonaId::Teen, self.youth_slang_teen),
            ],
            Signal::Emotion(Emotion::Distress) => vec![(PersonaId::Caring, self.distress)],
            Signal::Emotion(Emotion::Excitement) => vec![(PersonaId::Cheerful, self.excitement)],
            Signal::Emotion(Emotion::HighEnergy) => vec![(PersonaId::Energetic, self.high_energy)],
            Signal::Emotion(Emotion::Relaxed) => vec![(PersonaId::Calm, self.relaxed)],
            Signal::Verbose => vec![(PersonaId::Storyteller, self.verbose)],
        }
    }

    fn is_dialect_region(&self, region: &str) -> bool {
        let region = region.to_lowercase();
        self.dialect_regions.iter().any(|r| region.contains(r.as_str()))
    }
}

fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::DialectMarker => "dialect marker",
        Signal::InfantileSpeech => "infantile speech",
        Signal::FormalRegister => "formal register",
        Signal::YouthSlang => "youth slang",
        Signal::Emotion(Emotion::Distress) => "distress",
        Signal::Emotion(Emotion::Excitement) => "excitement",
        Signal::Emotion(Emotion::HighEnergy) => "high energy",
        Signal::Emotion(Emotion::Relaxed) => "relaxed mood",
        Signal::Verbose => "long message",
    }
}

// ─────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────

/// Running score for one persona during a scoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaCandidate {
    pub persona: PersonaId,
    pub score: u32,
    pub reasoning: Vec<String>,
}

impl PersonaCandidate {
    fn new(persona: PersonaId) -> Self {
        Self {
            persona,
            score: 0,
            reasoning: Vec::new(),
        }
    }

    fn add(&mut self, weight: u32, reason: impl Into<String>) {
        if weight == 0 {
            return;
        }
        self.score += weight;
        self.reasoning.push(format!("{} (+{})", reason.into(), weight));
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub persona: PersonaId,
    /// 0-100. Exactly 100 only for a manual override.
    pub confidence: u8,
    pub reasoning: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    pub signals: Vec<Signal>,
    pub emotions: Vec<Emotion>,
    pub detected_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────
// Scorer
// ─────────────────────────────────────────────────────────────────

/// Weighted heuristic classifier over the candidate personas.
#[derive(Debug, Clone)]
pub struct PersonaScorer {
    weights: Arc<ScoringWeights>,
    templates: Arc<TransitionTemplates>,
}

impl PersonaScorer {
    pub fn new(weights: Arc<ScoringWeights>, templates: Arc<TransitionTemplates>) -> Self {
        Self { weights, templates }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score every candidate and pick one. Never fails.
    ///
    /// `help_requested` is the extractor's help-token check for `text`.
    pub fn score(
        &self,
        profile: &UserProfile,
        signals: &SignalSet,
        help_requested: bool,
        history: &ConversationState,
    ) -> DetectionResult {
        let emotions = emotions_of(signals);
        let signal_list: Vec<Signal> = signals.iter().copied().collect();

        if let Some(pinned) = profile.manual_persona {
            debug!(persona = %pinned.slug(), "Manual persona override");
            return DetectionResult {
                persona: pinned,
                confidence: MANUAL_CONFIDENCE,
                reasoning: vec!["manual override".to_string()],
                transition: self.transition(history, pinned),
                signals: signal_list,
                emotions,
                detected_at: Utc::now(),
            };
        }

        let candidates = self.tally(profile, signals, help_requested, history);

        // Strictly greater keeps the first-declared persona on ties
        let mut best: Option<&PersonaCandidate> = None;
        for candidate in PersonaId::candidates().iter().filter_map(|p| candidates.get(p)) {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        let (best_persona, best_score, best_reasons) = best
            .map(|c| (c.persona, c.score, c.reasoning.clone()))
            .unwrap_or((PersonaId::AutoDetect, 0, Vec::new()));

        let (persona, reasoning) = if best_score <= self.weights.auto_detect_threshold {
            (
                PersonaId::AutoDetect,
                vec![format!("no conclusive signals (best score {})", best_score)],
            )
        } else {
            (best_persona, best_reasons)
        };

        let confidence = confidence_for(best_score);
        debug!(
            persona = %persona.slug(),
            score = best_score,
            confidence,
            signals = signals.len(),
            "Persona scored"
        );

        DetectionResult {
            persona,
            confidence,
            reasoning,
            transition: self.transition(history, persona),
            signals: signal_list,
            emotions,
            detected_at: Utc::now(),
        }
    }

    fn tally(
        &self,
        profile: &UserProfile,
        signals: &SignalSet,
        help_requested: bool,
        history: &ConversationState,
    ) -> HashMap<PersonaId, PersonaCandidate> {
        let w = &*self.weights;
        let mut candidates: HashMap<PersonaId, PersonaCandidate> = PersonaId::candidates()
            .iter()
            .map(|p| (*p, PersonaCandidate::new(*p)))
            .collect();
        let mut add = |persona: PersonaId, weight: u32, reason: String| {
            if let Some(c) = candidates.get_mut(&persona) {
                c.add(weight, reason);
            }
        };

        for signal in signals {
            for (persona, weight) in w.signal_weights(*signal) {
                add(persona, weight, format!("{} signal", signal_label(*signal)));
            }
        }

        if let Some(ref region) = profile.origin_region {
            if w.is_dialect_region(region) {
                add(PersonaId::Regional, w.dialect_region, format!("from {}", region));
            }
        }
        match profile.age_bracket {
            Some(AgeBracket::Teen) => {
                add(PersonaId::Teen, w.teen_age, "teen user".to_string());
                add(PersonaId::YouthDigital, w.teen_age_youth, "teen user".to_string());
            }
            Some(AgeBracket::YoungAdult) => {
                add(PersonaId::YouthDigital, w.young_adult, "young adult user".to_string());
            }
            Some(AgeBracket::Child) => {
                add(PersonaId::KidFriendly, w.child_age, "child user".to_string());
            }
            Some(AgeBracket::Senior) => {
                add(PersonaId::AccessibleGuide, w.senior_age, "senior user".to_string());
            }
            Some(AgeBracket::Adult) | None => {}
        }
        if profile.family == Some(FamilyComposition::WithChildren) {
            add(PersonaId::FamilyGuide, w.with_children, "travelling with children".to_string());
        }
        if profile.accessibility.is_some() {
            add(PersonaId::AccessibleGuide, w.accessibility, "accessibility need".to_string());
        }

        if let Some(preferred) = history.preferred_persona() {
            add(preferred, w.history, "preferred in this conversation".to_string());
        }
        if help_requested {
            add(PersonaId::Caring, w.help_request, "help requested".to_string());
        }

        candidates
    }

    fn transition(&self, history: &ConversationState, selected: PersonaId) -> Option<String> {
        history
            .active_persona()
            .and_then(|active| self.templates.announce(active, selected))
    }
}

impl Default for PersonaScorer {
    fn default() -> Self {
        Self::new(
            Arc::new(ScoringWeights::default()),
            Arc::new(TransitionTemplates::builtin()),
        )
    }
}

/// Linear score-to-confidence mapping, clamped away from 0 and 100.
pub fn confidence_for(score: u32) -> u8 {
    score
        .saturating_mul(10)
        .clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::profile::AccessibilityNeed;
    use crate::detection::SignalExtractor;
    use crate::session::ConversationStateTracker;

    fn score_text(text: &str, profile: &UserProfile) -> DetectionResult {
        let extractor = SignalExtractor::default();
        let signals = extractor.extract(text, profile);
        PersonaScorer::default().score(
            profile,
            &signals,
            extractor.mentions_help(text),
            &ConversationState::default(),
        )
    }

    #[test]
    fn test_confidence_mapping() {
        assert_eq!(confidence_for(0), 20);
        assert_eq!(confidence_for(2), 20);
        assert_eq!(confidence_for(5), 50);
        assert_eq!(confidence_for(30), 95);
        assert_eq!(confidence_for(u32::MAX), 95);
    }

    #[test]
    fn test_manual_override_wins() {
        let profile = UserProfile::pinned(PersonaId::Calm);
        let result = score_text("LET'S GO!!!! bruh so hyped", &profile);
        assert_eq!(result.persona, PersonaId::Calm);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.reasoning, vec!["manual override"]);
    }

    #[test]
    fn test_neutral_falls_back_to_auto_detect() {
        let result = score_text("What time is it?", &UserProfile::default());
        assert_eq!(result.persona, PersonaId::AutoDetect);
        assert!((20..=30).contains(&result.confidence));
        assert!(result.transition.is_none());
    }

    #[test]
    fn test_youth_slang_example() {
        let result = score_text("bruh this is lowkey fire no cap", &UserProfile::default());
        assert_eq!(result.persona, PersonaId::YouthDigital);
        assert!(result.confidence >= 50);
        assert!(result.signals.contains(&Signal::YouthSlang));
    }

    #[test]
    fn test_tie_breaks_on_declaration_order() {
        let weights = ScoringWeights {
            excitement: 7,
            ..Default::default()
        };
        let scorer = PersonaScorer::new(Arc::new(weights), Arc::new(TransitionTemplates::empty()));
        let signals: SignalSet = [Signal::FormalRegister, Signal::Emotion(Emotion::Excitement)]
            .into_iter()
            .collect();
        let result = scorer.score(
            &UserProfile::default(),
            &signals,
            false,
            &ConversationState::default(),
        );
        // Professional and Cheerful both score 7
        assert_eq!(result.persona, PersonaId::Professional);
    }

    #[test]
    fn test_profile_bonuses() {
        let profile = UserProfile {
            origin_region: Some("Austin, Texas".to_string()),
            ..Default::default()
        };
        let result = score_text("Where should we eat?", &profile);
        assert_eq!(result.persona, PersonaId::Regional);
        assert_eq!(result.confidence, 60);

        let profile = UserProfile {
            accessibility: Some(AccessibilityNeed::Visual),
            ..Default::default()
        };
        assert_eq!(
            score_text("Where should we eat?", &profile).persona,
            PersonaId::AccessibleGuide
        );
    }

    #[test]
    fn test_teen_profile_prefers_teen() {
        let profile = UserProfile {
            age_bracket: Some(AgeBracket::Teen),
            ..Default::default()
        };
        let result = score_text("anything fun nearby?", &profile);
        assert_eq!(result.persona, PersonaId::Teen);
    }

    #[test]
    fn test_help_request_boosts_caring() {
        let result = score_text("can you help me please", &UserProfile::default());
        assert_eq!(result.persona, PersonaId::Caring);
        assert_eq!(result.confidence, 40);
    }

    #[test]
    fn test_history_bonus_and_transition() {
        let extractor = SignalExtractor::default();
        let scorer = PersonaScorer::default();
        let mut tracker = ConversationStateTracker::default();

        let profile = UserProfile::default();
        let first = scorer.score(
            &profile,
            &extractor.extract("so relaxing and peaceful", &profile),
            false,
            tracker.state(),
        );
        assert_eq!(first.persona, PersonaId::Calm);
        assert!(first.transition.is_none());
        tracker.record_turn(&first);

        // Stickiness alone is enough to keep the persona on a neutral turn
        let sticky = scorer.score(&profile, &SignalSet::new(), false, tracker.state());
        assert_eq!(sticky.persona, PersonaId::Calm);
        assert!(sticky.transition.is_none());

        let switched = scorer.score(
            &profile,
            &extractor.extract("LET'S GO, I'm so pumped!!!!", &profile),
            false,
            tracker.state(),
        );
        assert_eq!(switched.persona, PersonaId::Energetic);
        assert!(switched.transition.is_some());
    }
}
