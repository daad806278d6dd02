//! Core types for the persona system.
//!
//! A persona is a named response voice: how prompts are conditioned, how the
//! generated text is restyled, and which voice parameters are used when the
//! reply is spoken.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Persona Id
// ─────────────────────────────────────────────────────────────────

/// Closed set of personas the engine can adopt.
///
/// Declaration order matters: it is the scoring tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaId {
    /// Neutral fallback used when nothing in the message is conclusive.
    AutoDetect,
    /// Formal, precise register.
    Professional,
    /// Gentle and supportive, for distress or help requests.
    Caring,
    /// Warm enthusiasm for excited users.
    Cheerful,
    /// Punchy, fast, high-energy.
    Energetic,
    /// Slow, soothing, unhurried.
    Calm,
    /// Local colour for users writing in a regional dialect.
    Regional,
    /// Very simple words for young children.
    KidFriendly,
    /// Relaxed and relatable for teenagers.
    Teen,
    /// Internet-native slang for young adults.
    YouthDigital,
    /// Rich, descriptive answers for long-form writers.
    Storyteller,
    /// Practical planning for families with children.
    FamilyGuide,
    /// Clear, structured language for accessibility needs.
    AccessibleGuide,
}

impl PersonaId {
    /// Slug used in file names, CLI args and serialized output.
    pub fn slug(&self) -> &'static str {
        match self {
            PersonaId::AutoDetect => "auto-detect",
            PersonaId::Professional => "professional",
            PersonaId::Caring => "caring",
            PersonaId::Cheerful => "cheerful",
            PersonaId::Energetic => "energetic",
            PersonaId::Calm => "calm",
            PersonaId::Regional => "regional",
            PersonaId::KidFriendly => "kid-friendly",
            PersonaId::Teen => "teen",
            PersonaId::YouthDigital => "youth-digital",
            PersonaId::Storyteller => "storyteller",
            PersonaId::FamilyGuide => "family-guide",
            PersonaId::AccessibleGuide => "accessible-guide",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            PersonaId::AutoDetect => "Auto-Detect",
            PersonaId::Professional => "Professional",
            PersonaId::Caring => "Caring Companion",
            PersonaId::Cheerful => "Cheerful Guide",
            PersonaId::Energetic => "Energetic Buddy",
            PersonaId::Calm => "Calm Companion",
            PersonaId::Regional => "Local Friend",
            PersonaId::KidFriendly => "Kid-Friendly Helper",
            PersonaId::Teen => "Teen Buddy",
            PersonaId::YouthDigital => "Digital Native",
            PersonaId::Storyteller => "Storyteller",
            PersonaId::FamilyGuide => "Family Guide",
            PersonaId::AccessibleGuide => "Accessible Guide",
        }
    }

    /// All personas in declaration order.
    pub fn all() -> &'static [PersonaId] {
        &[
            PersonaId::AutoDetect,
            PersonaId::Professional,
            PersonaId::Caring,
            PersonaId::Cheerful,
            PersonaId::Energetic,
            PersonaId::Calm,
            PersonaId::Regional,
            PersonaId::KidFriendly,
            PersonaId::Teen,
            PersonaId::YouthDigital,
            PersonaId::Storyteller,
            PersonaId::FamilyGuide,
            PersonaId::AccessibleGuide,
        ]
    }

    /// Personas that take part in scoring (everything except the fallback).
    pub fn candidates() -> &'static [PersonaId] {
        &PersonaId::all()[1..]
    }
}

impl Default for PersonaId {
    fn default() -> Self {
        PersonaId::AutoDetect
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PersonaId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        PersonaId::all()
            .iter()
            .copied()
            .find(|p| p.slug() == normalized || p.slug().replace('-', "") == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = PersonaId::all().iter().map(|p| p.slug()).collect();
                format!("Unknown persona '{}'. Valid: {}", s, valid.join(", "))
            })
    }
}

// ─────────────────────────────────────────────────────────────────
// Voice Parameters
// ─────────────────────────────────────────────────────────────────

/// Parameters sent to the primary network voice service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Provider voice identifier.
    pub voice_id: String,

    /// 0.0 (expressive) to 1.0 (monotone).
    #[serde(default = "default_stability")]
    pub stability: f32,

    /// How closely to match the reference voice.
    #[serde(default = "default_similarity")]
    pub similarity_boost: f32,

    /// Style exaggeration, 0.0 disables it.
    #[serde(default)]
    pub style: f32,

    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity() -> f32 {
    0.75
}

fn default_true() -> bool {
    true
}

/// Prosody for the local synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prosody {
    /// Speaking rate multiplier, 1.0 is normal.
    pub rate: f32,
    /// Pitch multiplier, 1.0 is normal.
    pub pitch: f32,
    /// Volume, 0.0 to 1.0.
    pub volume: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 0.9,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Profile
// ─────────────────────────────────────────────────────────────────

/// Everything the engine knows about one persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub id: PersonaId,

    pub display_name: String,

    /// Short human-readable description.
    pub description: String,

    /// Voice instructions injected into the generation prompt.
    pub prompt_voice: String,

    pub voice: VoiceProfile,

    pub prosody: Prosody,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_slug_roundtrip() {
        for p in PersonaId::all() {
            assert_eq!(p.slug().parse::<PersonaId>().unwrap(), *p);
        }
    }

    #[test]
    fn test_persona_from_str_variants() {
        assert_eq!("YouthDigital".parse::<PersonaId>().unwrap(), PersonaId::YouthDigital);
        assert_eq!("youth_digital".parse::<PersonaId>().unwrap(), PersonaId::YouthDigital);
        assert_eq!("Kid Friendly".parse::<PersonaId>().unwrap(), PersonaId::KidFriendly);
        assert!("pirate".parse::<PersonaId>().is_err());
    }

    #[test]
    fn test_candidates_exclude_auto_detect() {
        assert_eq!(PersonaId::all().len(), 13);
        assert_eq!(PersonaId::candidates().len(), 12);
        assert!(!PersonaId::candidates().contains(&PersonaId::AutoDetect));
    }

    #[test]
    fn test_declaration_order_is_ord() {
        let mut sorted = PersonaId::all().to_vec();
        sorted.sort();
        assert_eq!(sorted, PersonaId::all());
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&PersonaId::KidFriendly).unwrap();
        assert_eq!(json, "\"kid-friendly\"");
        let parsed: PersonaId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, PersonaId::KidFriendly);
    }
}
