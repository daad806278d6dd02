//! Transition announcement templates keyed by `(old, new)` persona pairs.

use std::collections::HashMap;

use crate::persona::PersonaId;

/// Immutable announcement table with a generic fallback.
#[derive(Debug, Clone)]
pub struct TransitionTemplates {
    pairs: HashMap<(PersonaId, PersonaId), String>,
}

impl TransitionTemplates {
    /// Table with no pair-specific templates; every change uses the fallback.
    pub fn empty() -> Self {
        Self {
            pairs: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        use PersonaId::*;

        let entries: &[(PersonaId, PersonaId, &str)] = &[
            (Professional, Caring, "Let me set the formalities aside for a moment. I'm here for you."),
            (Cheerful, Caring, "Okay, slowing down. Let's take care of this together."),
            (Energetic, Caring, "Hey, let's pause for a second. Tell me what's going on."),
            (YouthDigital, Caring, "Real talk for a sec. I've got you."),
            (Caring, Cheerful, "That's so good to hear! Let's keep the good vibes going."),
            (Caring, Professional, "Glad things are steadier. Let's get down to the details."),
            (Calm, Energetic, "Alright, turning the energy up! Let's go!"),
            (Energetic, Calm, "Let's bring it down a notch and take things easy."),
            (Professional, YouthDigital, "Switching it up, keeping it casual from here."),
            (YouthDigital, Professional, "Understood. I'll keep things more formal from here."),
            (Teen, YouthDigital, "Leveling up the lingo. Let's go."),
            (AutoDetect, Regional, "Well now, sounds like you're from around my neck of the woods!"),
            (AutoDetect, KidFriendly, "Hi there, friend! Let's have some fun finding things out!"),
            (FamilyGuide, KidFriendly, "Now let's make this fun for the little ones!"),
            (KidFriendly, FamilyGuide, "Let's switch back to planning for the whole family."),
            (AutoDetect, AccessibleGuide, "I'll keep things clear and step by step from here."),
            (AutoDetect, Storyteller, "Ah, a fellow lover of detail. Let me paint you a picture."),
        ];

        let pairs = entries
            .iter()
            .map(|(old, new, text)| ((*old, *new), text.to_string()))
            .collect();
        Self { pairs }
    }

    /// Add or replace the template for a pair.
    pub fn with(mut self, old: PersonaId, new: PersonaId, text: impl Into<String>) -> Self {
        self.pairs.insert((old, new), text.into());
        self
    }

    /// Announcement for a change from `old` to `new`, or `None` if nothing changed.
    pub fn announce(&self, old: PersonaId, new: PersonaId) -> Option<String> {
        if old == new {
            return None;
        }
        Some(
            self.pairs
                .get(&(old, new))
                .cloned()
                .unwrap_or_else(|| format!("Switching to {}.", new.display_name())),
        )
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for TransitionTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_persona_is_silent() {
        let templates = TransitionTemplates::builtin();
        for p in PersonaId::all() {
            assert_eq!(templates.announce(*p, *p), None);
        }
    }

    #[test]
    fn test_specific_template() {
        let templates = TransitionTemplates::builtin();
        let text = templates
            .announce(PersonaId::Energetic, PersonaId::Calm)
            .unwrap();
        assert!(text.contains("take things easy"));
    }

    #[test]
    fn test_generic_fallback() {
        let templates = TransitionTemplates::empty();
        assert_eq!(
            templates.announce(PersonaId::Teen, PersonaId::Storyteller),
            Some("Switching to Storyteller.".to_string())
        );
    }

    #[test]
    fn test_with_overrides_pair() {
        let templates =
            TransitionTemplates::empty().with(PersonaId::Calm, PersonaId::Teen, "yo");
        assert_eq!(templates.len(), 1);
        assert_eq!(
            templates.announce(PersonaId::Calm, PersonaId::Teen).as_deref(),
            Some("yo")
        );
    }
}
