//! System prompt assembly from ordered, named sections.
//!
//! The persona-conditioned prompt is built as a list of sections (identity,
//! voice, audience, conversation, rules). Callers can inject, replace or drop
//! sections by name before rendering, and the rendered prompt carries a
//! SHA-256 fingerprint so identical inputs are provably identical prompts.

use sha2::{Digest, Sha256};

use crate::detection::{DetectionResult, UserProfile};
use crate::persona::PersonaProfile;
use crate::session::ConversationState;

pub const SECTION_IDENTITY: &str = "identity";
pub const SECTION_VOICE: &str = "voice";
pub const SECTION_AUDIENCE: &str = "audience";
pub const SECTION_CONVERSATION: &str = "conversation";
pub const SECTION_RULES: &str = "rules";

/// One named block of the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSection {
    pub name: String,
    pub body: String,
}

impl PromptSection {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Ordered section list with named injection points.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard sections for a persona, user and conversation.
    pub fn for_persona(
        persona: &PersonaProfile,
        profile: &UserProfile,
        detection: &DetectionResult,
        state: &ConversationState,
    ) -> Self {
        let mut builder = Self::new();

        builder.push(PromptSection::new(
            SECTION_IDENTITY,
            format!(
                "You are {}, a travel and local-discovery assistant. {}.",
                persona.display_name, persona.description
            ),
        ));
        builder.push(PromptSection::new(SECTION_VOICE, persona.prompt_voice.clone()));

        let audience = profile.describe();
        if !audience.is_empty() {
            builder.push(PromptSection::new(
                SECTION_AUDIENCE,
                format!("About the user: {}.", audience.join("; ")),
            ));
        }

        let mut conversation = format!("This is message {} of the conversation.", state.message_count() + 1);
        if !detection.emotions.is_empty() {
            let moods: Vec<&str> = detection.emotions.iter().map(|e| e.label()).collect();
            conversation.push_str(&format!(" The user currently sounds: {}.", moods.join(", ")));
        }
        if let Some(ref transition) = detection.transition {
            conversation.push_str(&format!(
                " You just changed style; open naturally in the new voice (\"{}\").",
                transition
            ));
        }
        builder.push(PromptSection::new(SECTION_CONVERSATION, conversation));

        builder.push(PromptSection::new(
            SECTION_RULES,
            "Keep replies under 120 words. Never invent prices, opening hours or bookings. \
             If you are unsure, say so and suggest where to check.",
        ));

        builder
    }

    /// Append a section at the end.
    pub fn push(&mut self, section: PromptSection) -> &mut Self {
        self.sections.push(section);
        self
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    /// Insert before the named section. Returns false if it does not exist.
    pub fn insert_before(&mut self, anchor: &str, section: PromptSection) -> bool {
        match self.position(anchor) {
            Some(i) => {
                self.sections.insert(i, section);
                true
            }
            None => false,
        }
    }

    /// Insert after the named section. Returns false if it does not exist.
    pub fn insert_after(&mut self, anchor: &str, section: PromptSection) -> bool {
        match self.position(anchor) {
            Some(i) => {
                self.sections.insert(i + 1, section);
                true
            }
            None => false,
        }
    }

    /// Replace the body of the named section.
    pub fn replace(&mut self, name: &str, body: impl Into<String>) -> bool {
        match self.position(name) {
            Some(i) => {
                self.sections[i].body = body.into();
                true
            }
            None => false,
        }
    }

    /// Drop the named section.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.sections.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn build(&self) -> SystemPrompt {
        SystemPrompt {
            sections: self.sections.clone(),
        }
    }
}

/// Finished prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    sections: Vec<PromptSection>,
}

impl SystemPrompt {
    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&PromptSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Section bodies in order, separated by blank lines.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.trim())
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Hex SHA-256 of [`render`](Self::render).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{PersonaDetector, FamilyComposition};
    use crate::persona::{PersonaId, PersonaRegistry};

    fn sample() -> PromptBuilder {
        let registry = PersonaRegistry::builtin();
        let state = ConversationState::default();
        let profile = UserProfile {
            family: Some(FamilyComposition::WithChildren),
            ..Default::default()
        };
        let (detection, profile) =
            PersonaDetector::default().detect("so worried about the trip", &profile, &state);
        PromptBuilder::for_persona(registry.profile(PersonaId::Caring), &profile, &detection, &state)
    }

    #[test]
    fn test_standard_section_order() {
        assert_eq!(
            sample().section_names(),
            vec![SECTION_IDENTITY, SECTION_VOICE, SECTION_AUDIENCE, SECTION_CONVERSATION, SECTION_RULES]
        );
    }

    #[test]
    fn test_audience_omitted_for_empty_profile() {
        let registry = PersonaRegistry::builtin();
        let state = ConversationState::default();
        let (detection, profile) =
            PersonaDetector::default().detect("hello", &UserProfile::default(), &state);
        let builder =
            PromptBuilder::for_persona(registry.profile(PersonaId::AutoDetect), &profile, &detection, &state);
        assert!(!builder.section_names().contains(&SECTION_AUDIENCE));
    }

    #[test]
    fn test_conversation_mentions_emotion() {
        let prompt = sample().build();
        let conversation = prompt.section(SECTION_CONVERSATION).unwrap();
        assert!(conversation.body.contains("distress"));
    }

    #[test]
    fn test_injection_points() {
        let mut builder = sample();
        assert!(builder.insert_before(SECTION_RULES, PromptSection::new("weather", "It is raining.")));
        assert!(builder.insert_after(SECTION_IDENTITY, PromptSection::new("locale", "Answer in English.")));
        assert!(builder.replace(SECTION_RULES, "Be brief."));
        assert!(builder.remove(SECTION_AUDIENCE));
        assert!(!builder.remove("missing"));

        assert_eq!(
            builder.section_names(),
            vec![SECTION_IDENTITY, "locale", SECTION_VOICE, SECTION_CONVERSATION, "weather", SECTION_RULES]
        );
        assert!(builder.build().render().ends_with("Be brief."));
    }

    #[test]
    fn test_fingerprint_is_reproducible() {
        let a = sample().build();
        let b = sample().build();
        assert_eq!(a.render(), b.render());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut changed = sample();
        changed.replace(SECTION_RULES, "Different.");
        assert_ne!(changed.build().fingerprint(), a.fingerprint());
    }
}
