//! Persona detection: signal extraction followed by weighted scoring.

mod lexicon;
mod profile;
mod scorer;
mod signals;

use std::sync::Arc;

pub use lexicon::{Lexicon, NormalizedText};
pub use profile::{AccessibilityNeed, AgeBracket, BudgetTier, FamilyComposition, UserProfile};
pub use scorer::{
    confidence_for, DetectionResult, PersonaCandidate, PersonaScorer, ScoringWeights,
    MANUAL_CONFIDENCE,
};
pub use signals::{emotions_of, Emotion, ExtractorThresholds, Signal, SignalExtractor, SignalSet};

use crate::session::{ConversationState, TransitionTemplates};

/// Extractor and scorer wired together.
#[derive(Debug, Clone)]
pub struct PersonaDetector {
    extractor: SignalExtractor,
    scorer: PersonaScorer,
}

impl PersonaDetector {
    pub fn new(extractor: SignalExtractor, scorer: PersonaScorer) -> Self {
        Self { extractor, scorer }
    }

    /// Build from configuration pieces, sharing one template table.
    pub fn from_parts(
        thresholds: ExtractorThresholds,
        weights: ScoringWeights,
        templates: Arc<TransitionTemplates>,
    ) -> Self {
        Self::new(
            SignalExtractor::new(Arc::new(Lexicon::builtin()), thresholds),
            PersonaScorer::new(Arc::new(weights), templates),
        )
    }

    pub fn extractor(&self) -> &SignalExtractor {
        &self.extractor
    }

    pub fn scorer(&self) -> &PersonaScorer {
        &self.scorer
    }

    /// Enrich the profile from the text, then extract and score.
    ///
    /// Returns the enriched profile alongside the result so callers can use
    /// it for prompt conditioning.
    pub fn detect(
        &self,
        text: &str,
        profile: &UserProfile,
        history: &ConversationState,
    ) -> (DetectionResult, UserProfile) {
        let enriched = self.extractor.enrich(text, profile);
        let signals = self.extractor.extract(text, &enriched);
        let help = self.extractor.mentions_help(text);
        let result = self.scorer.score(&enriched, &signals, help, history);
        (result, enriched)
    }
}

impl Default for PersonaDetector {
    fn default() -> Self {
        Self::new(SignalExtractor::default(), PersonaScorer::default())
    }
}
