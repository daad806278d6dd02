//! Signal extraction: lexical, emotional and structural cues from raw text.
//!
//! Extraction is a pure function of `(text, profile)`: the same inputs always
//! yield the same [`SignalSet`]. An empty set is a valid result.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::lexicon::{first_hint, Lexicon, NormalizedText};
use super::profile::UserProfile;

/// Emotion classes the extractor recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Emotion {
    Distress,
    Excitement,
    HighEnergy,
    Relaxed,
}

impl Emotion {
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Distress => "distress",
            Emotion::Excitement => "excitement",
            Emotion::HighEnergy => "high energy",
            Emotion::Relaxed => "relaxed",
        }
    }
}

/// A tagged fact extracted from one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    DialectMarker,
    InfantileSpeech,
    FormalRegister,
    YouthSlang,
    Emotion(Emotion),
    /// Message-length class "long": more characters than the verbose threshold.
    Verbose,
}

/// Unordered set of fired signals.
pub type SignalSet = BTreeSet<Signal>;

/// Emotions present in a signal set, in a stable order.
pub fn emotions_of(signals: &SignalSet) -> Vec<Emotion> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::Emotion(e) => Some(*e),
            _ => None,
        })
        .collect()
}

/// Structural thresholds for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorThresholds {
    /// Character count above which a message is verbose.
    pub verbose_chars: usize,
    /// Exclamation marks above this count imply high energy.
    pub exclamations: usize,
}

impl Default for ExtractorThresholds {
    fn default() -> Self {
        Self {
            verbose_chars: 200,
            exclamations: 3,
        }
    }
}

/// Pulls signals out of message text using an injected [`Lexicon`].
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    lexicon: Arc<Lexicon>,
    thresholds: ExtractorThresholds,
}

impl SignalExtractor {
    pub fn new(lexicon: Arc<Lexicon>, thresholds: ExtractorThresholds) -> Self {
        Self { lexicon, thresholds }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Extract every signal that fires for `text`.
    ///
    /// The profile is accepted for signals that depend on who is writing;
    /// today all profile-driven effects are scoring bonuses instead.
    pub fn extract(&self, text: &str, _profile: &UserProfile) -> SignalSet {
        let normalized = NormalizedText::new(text);
        let lex = &*self.lexicon;
        let mut signals = SignalSet::new();

        let tables: [(&[String], Signal); 8] = [
            (&lex.dialect, Signal::DialectMarker),
            (&lex.infantile, Signal::InfantileSpeech),
            (&lex.formal, Signal::FormalRegister),
            (&lex.youth_slang, Signal::YouthSlang),
            (&lex.distress, Signal::Emotion(Emotion::Distress)),
            (&lex.excitement, Signal::Emotion(Emotion::Excitement)),
            (&lex.high_energy, Signal::Emotion(Emotion::HighEnergy)),
            (&lex.relaxed, Signal::Emotion(Emotion::Relaxed)),
        ];
        for (phrases, signal) in tables {
            if normalized.first_match(phrases).is_some() {
                signals.insert(signal);
            }
        }

        if text.matches('!').count() > self.thresholds.exclamations {
            signals.insert(Signal::Emotion(Emotion::HighEnergy));
        }
        if text.chars().count() > self.thresholds.verbose_chars {
            signals.insert(Signal::Verbose);
        }

        signals
    }

    /// Whether the message asks for help or support.
    pub fn mentions_help(&self, text: &str) -> bool {
        NormalizedText::new(text)
            .first_match(&self.lexicon.help)
            .is_some()
    }

    /// Fill empty profile fields from hints in the text. Set fields are kept.
    pub fn enrich(&self, text: &str, profile: &UserProfile) -> UserProfile {
        let normalized = NormalizedText::new(text);
        let lex = &*self.lexicon;
        let mut enriched = profile.clone();

        if enriched.age_bracket.is_none() {
            enriched.age_bracket = first_hint(&normalized, &lex.age_hints);
        }
        if enriched.family.is_none() {
            enriched.family = first_hint(&normalized, &lex.family_hints);
        }
        if enriched.budget.is_none() {
            enriched.budget = first_hint(&normalized, &lex.budget_hints);
        }
        if enriched.accessibility.is_none() {
            enriched.accessibility = first_hint(&normalized, &lex.accessibility_hints);
        }

        enriched
    }
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(Arc::new(Lexicon::builtin()), ExtractorThresholds::default())
    }
}
