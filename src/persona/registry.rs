//! Bundled persona registry: immutable profile table keyed by [`PersonaId`].
//!
//! The registry is built once (bundled defaults, optionally merged with
//! on-disk overrides from a [`PersonaCatalog`]) and shared as an `Arc` by
//! every component that needs persona data.

use std::collections::HashMap;

use tracing::info;

use crate::error::Result;

use super::catalog::PersonaCatalog;
use super::types::{PersonaId, PersonaProfile, Prosody, VoiceProfile};

/// Registry of persona profiles.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    profiles: HashMap<PersonaId, PersonaProfile>,
}

impl PersonaRegistry {
    /// Registry holding only the bundled defaults.
    pub fn builtin() -> Self {
        let profiles = PersonaId::all()
            .iter()
            .map(|id| (*id, bundled_profile(*id)))
            .collect();
        Self { profiles }
    }

    /// Bundled defaults with any overrides found in `catalog` applied on top.
    ///
    /// A malformed or mismatched override file is an error, not a skip.
    pub fn with_overrides(catalog: &PersonaCatalog) -> Result<Self> {
        let mut registry = Self::builtin();
        for id in PersonaId::all() {
            let Some(ov) = catalog.get(*id)? else {
                continue;
            };
            if let Some(profile) = registry.profiles.get_mut(id) {
                ov.apply_to(profile);
                info!(persona = %id.slug(), dir = %catalog.dir().display(), "Persona override applied");
            }
        }
        Ok(registry)
    }

    /// Profile for a persona. Every [`PersonaId`] has one.
    pub fn profile(&self, id: PersonaId) -> &PersonaProfile {
        // builtin() inserts every id, and overrides only mutate in place
        &self.profiles[&id]
    }

    /// Profiles in declaration order.
    pub fn list(&self) -> Vec<&PersonaProfile> {
        PersonaId::all().iter().map(|id| self.profile(*id)).collect()
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn voice(voice_id: &str, stability: f32, style: f32) -> VoiceProfile {
    VoiceProfile {
        voice_id: voice_id.to_string(),
        stability,
        similarity_boost: 0.75,
        style,
        use_speaker_boost: true,
    }
}

fn prosody(rate: f32, pitch: f32, volume: f32) -> Prosody {
    Prosody { rate, pitch, volume }
}

fn bundled_profile(id: PersonaId) -> PersonaProfile {
    let (description, prompt_voice, voice, prosody) = match id {
        PersonaId::AutoDetect => (
            "Balanced default voice while the user's style is still unclear",
            "Be friendly, clear and neutral. Mirror the user's level of formality.",
            voice("21m00Tcm4TlvDq8ikWAM", 0.5, 0.0),
            prosody(1.0, 1.0, 0.9),
        ),
        PersonaId::Professional => (
            "Formal, precise and courteous",
            "Use a formal, courteous register. Complete sentences, no slang, no emoji. Be precise and concise.",
            voice("nPczCjzI2devNBz1zQrb", 0.75, 0.0),
            prosody(0.95, 0.95, 0.9),
        ),
        PersonaId::Caring => (
            "Gentle and supportive for users who are struggling",
            "Acknowledge feelings first. Be gentle, patient and reassuring. Offer one concrete next step.",
            voice("XrExE9yKIg1WjnnlVkGX", 0.7, 0.1),
            prosody(0.85, 0.95, 0.8),
        ),
        PersonaId::Cheerful => (
            "Warm enthusiasm that matches an excited user",
            "Share the user's excitement. Upbeat, warm, encouraging. A little emoji is welcome.",
            voice("EXAVITQu4vr4xnSDxMaL", 0.4, 0.4),
            prosody(1.1, 1.1, 1.0),
        ),
        PersonaId::Energetic => (
            "Punchy, fast and high-energy",
            "Short punchy sentences. High energy. Lead with action.",
            voice("TX3LPaxmHKxFdv7VOQHJ", 0.3, 0.6),
            prosody(1.2, 1.1, 1.0),
        ),
        PersonaId::Calm => (
            "Slow, soothing and unhurried",
            "Slow down. Soft, soothing phrasing. Never use exclamation marks.",
            voice("pFZP5JQG7iQjIQuC4Bku", 0.85, 0.0),
            prosody(0.8, 0.9, 0.75),
        ),
        PersonaId::Regional => (
            "Local colour for users writing in a regional dialect",
            "Talk like a friendly local. Relaxed, neighbourly, a touch of regional colour without caricature.",
            voice("N2lVS1w4EtoT3dr4eOWO", 0.5, 0.3),
            prosody(1.0, 1.0, 0.9),
        ),
        PersonaId::KidFriendly => (
            "Very simple words for young children",
            "Use very simple words and very short sentences. Be playful and kind. Nothing scary.",
            voice("Xb7hH8MSUJpSbSDYk0k2", 0.45, 0.5),
            prosody(0.9, 1.25, 0.9),
        ),
        PersonaId::Teen => (
            "Relaxed and relatable for teenagers",
            "Casual and relatable, like a slightly older friend. Light humour, no lecturing.",
            voice("SAz9YHcvj6GT2YYXdXww", 0.45, 0.3),
            prosody(1.05, 1.05, 0.9),
        ),
        PersonaId::YouthDigital => (
            "Internet-native slang for young adults",
            "Internet-native tone. Casual, quick, meme-aware. Keep it real and skip the formalities.",
            voice("cgSgspJ2msm6clMCkdW9", 0.35, 0.5),
            prosody(1.1, 1.05, 0.95),
        ),
        PersonaId::Storyteller => (
            "Rich, descriptive answers for long-form writers",
            "Paint a picture. Descriptive, flowing prose with vivid detail, still organised.",
            voice("JBFqnCBsd6RMkjVDRZzb", 0.6, 0.3),
            prosody(0.95, 0.95, 0.9),
        ),
        PersonaId::FamilyGuide => (
            "Practical planning for families with children",
            "Practical and reassuring. Think about kids' needs, safety and timing. Use short lists.",
            voice("FGY2WhTYpPnrIDTdsKH5", 0.6, 0.2),
            prosody(1.0, 1.0, 0.9),
        ),
        PersonaId::AccessibleGuide => (
            "Clear, structured language for accessibility needs",
            "Plain language. One idea per sentence. State accessibility details explicitly. No emoji.",
            voice("onwK4e9ZLuTAKqWW03F9", 0.8, 0.0),
            prosody(0.85, 1.0, 1.0),
        ),
    };

    PersonaProfile {
        id,
        display_name: id.display_name().to_string(),
        description: description.to_string(),
        prompt_voice: prompt_voice.to_string(),
        voice,
        prosody,
    }
}
