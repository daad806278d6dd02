//! Per-persona rewriting rules.
//!
//! Rules are plain data. The table is built once and injected into the
//! renderer; a persona with no entry renders as the identity transform.

use std::collections::HashMap;

use crate::persona::PersonaId;

/// What to do with emoji in the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiPolicy {
    Keep,
    Strip,
    /// Keep only these; strip everything else.
    Palette(Vec<char>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capitalization {
    Preserve,
    /// Upper-case the first letter of every sentence.
    Sentence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclamationPolicy {
    Preserve,
    /// Every `!` run becomes a full stop.
    Soften,
    /// Sentence-final full stops become `!`.
    Amplify,
}

/// Rewriting rules for one persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRules {
    /// Whole-word, case-insensitive replacements; keys are lowercase.
    pub substitutions: Vec<(String, String)>,
    pub opener: Option<String>,
    pub closer: Option<String>,
    pub emoji: EmojiPolicy,
    /// Appended once if the reply does not already contain it.
    pub signature_emoji: Option<char>,
    pub capitalization: Capitalization,
    pub exclamation: ExclamationPolicy,
    /// Sentences longer than this are broken up.
    pub max_sentence_words: Option<usize>,
}

impl Default for RenderRules {
    fn default() -> Self {
        Self {
            substitutions: Vec::new(),
            opener: None,
            closer: None,
            emoji: EmojiPolicy::Keep,
            signature_emoji: None,
            capitalization: Capitalization::Preserve,
            exclamation: ExclamationPolicy::Preserve,
            max_sentence_words: None,
        }
    }
}

impl RenderRules {
    pub fn substitution(&self, word: &str) -> Option<&str> {
        let lower = word.to_lowercase();
        self.substitutions
            .iter()
            .find(|(from, _)| *from == lower)
            .map(|(_, to)| to.as_str())
    }
}

/// Whether `c` is an emoji or an emoji joiner/modifier.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F | 0x200D | 0x20E3
    )
}

fn subs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

/// Immutable map of persona to rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<PersonaId, RenderRules>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, persona: PersonaId, rules: RenderRules) -> Self {
        self.rules.insert(persona, rules);
        self
    }

    pub fn get(&self, persona: PersonaId) -> Option<&RenderRules> {
        self.rules.get(&persona)
    }

    pub fn builtin() -> Self {
        use Capitalization::*;
        use ExclamationPolicy::*;

        Self::empty()
            .with(
                PersonaId::Professional,
                RenderRules {
                    substitutions: subs(&[
                        ("hey", "hello"),
                        ("yeah", "yes"),
                        ("yep", "yes"),
                        ("gonna", "going to"),
                        ("wanna", "want to"),
                        ("cool", "excellent"),
                        ("awesome", "excellent"),
                        ("guys", "everyone"),
                        ("ok", "certainly"),
                    ]),
                    emoji: EmojiPolicy::Strip,
                    capitalization: Sentence,
                    exclamation: Soften,
                    max_sentence_words: Some(30),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Caring,
                RenderRules {
                    substitutions: subs(&[("problem", "concern"), ("must", "might want to")]),
                    closer: Some("I'm here if you need anything else.".to_string()),
                    emoji: EmojiPolicy::Palette(vec!['💙', '🤗', '🌷']),
                    exclamation: Soften,
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Cheerful,
                RenderRules {
                    substitutions: subs(&[("good", "great"), ("nice", "lovely")]),
                    emoji: EmojiPolicy::Palette(vec!['😊', '🎉', '✨', '🌞']),
                    signature_emoji: Some('😊'),
                    exclamation: Amplify,
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Energetic,
                RenderRules {
                    substitutions: subs(&[("fun", "epic"), ("good", "awesome"), ("walk", "dash")]),
                    opener: Some("Let's go!".to_string()),
                    emoji: EmojiPolicy::Palette(vec!['🔥', '⚡', '🚀', '💪']),
                    signature_emoji: Some('⚡'),
                    exclamation: Amplify,
                    max_sentence_words: Some(14),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Calm,
                RenderRules {
                    substitutions: subs(&[("asap", "whenever you're ready"), ("quickly", "gently")]),
                    closer: Some("Take your time.".to_string()),
                    emoji: EmojiPolicy::Palette(vec!['🌿', '🍃']),
                    signature_emoji: Some('🌿'),
                    exclamation: Soften,
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Regional,
                RenderRules {
                    substitutions: subs(&[("hello", "howdy"), ("hi", "howdy"), ("friend", "partner")]),
                    closer: Some("Y'all take care now.".to_string()),
                    emoji: EmojiPolicy::Palette(vec!['🤠']),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::KidFriendly,
                RenderRules {
                    substitutions: subs(&[
                        ("delicious", "yummy"),
                        ("large", "big"),
                        ("enormous", "super big"),
                        ("difficult", "tricky"),
                        ("purchase", "buy"),
                        ("approximately", "about"),
                        ("children", "kids"),
                    ]),
                    emoji: EmojiPolicy::Palette(vec!['🌈', '🦄', '🐶', '⭐']),
                    signature_emoji: Some('🌈'),
                    capitalization: Sentence,
                    exclamation: Amplify,
                    max_sentence_words: Some(12),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Teen,
                RenderRules {
                    substitutions: subs(&[("very", "super"), ("friends", "crew")]),
                    emoji: EmojiPolicy::Palette(vec!['😎', '🙌']),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::YouthDigital,
                RenderRules {
                    substitutions: subs(&[
                        ("amazing", "fire"),
                        ("excellent", "elite"),
                        ("great", "solid"),
                        ("friends", "fam"),
                        ("honestly", "ngl"),
                    ]),
                    emoji: EmojiPolicy::Palette(vec!['💯', '🔥', '✨']),
                    signature_emoji: Some('💯'),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::Storyteller,
                RenderRules {
                    opener: Some("Picture this:".to_string()),
                    emoji: EmojiPolicy::Strip,
                    ..Default::default()
                },
            )
            .with(
                PersonaId::FamilyGuide,
                RenderRules {
                    substitutions: subs(&[("kids", "little ones")]),
                    closer: Some("Have a wonderful time together!".to_string()),
                    emoji: EmojiPolicy::Palette(vec!['🏡', '🎈']),
                    ..Default::default()
                },
            )
            .with(
                PersonaId::AccessibleGuide,
                RenderRules {
                    substitutions: subs(&[
                        ("utilize", "use"),
                        ("approximately", "about"),
                        ("commence", "start"),
                        ("assistance", "help"),
                        ("subsequently", "then"),
                    ]),
                    emoji: EmojiPolicy::Strip,
                    capitalization: Sentence,
                    exclamation: Soften,
                    max_sentence_words: Some(15),
                    ..Default::default()
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_no_rules_for_auto_detect() {
        let table = RuleTable::builtin();
        assert!(table.get(PersonaId::AutoDetect).is_none());
        for p in PersonaId::candidates() {
            assert!(table.get(*p).is_some(), "missing rules for {}", p.slug());
        }
    }

    #[test]
    fn test_substitution_is_case_insensitive() {
        let table = RuleTable::builtin();
        let rules = table.get(PersonaId::Professional).unwrap();
        assert_eq!(rules.substitution("Gonna"), Some("going to"));
        assert_eq!(rules.substitution("gone"), None);
    }

    #[test]
    fn test_is_emoji() {
        assert!(is_emoji('🔥'));
        assert!(is_emoji('⚡'));
        assert!(!is_emoji('a'));
        assert!(!is_emoji('é'));
    }
}
