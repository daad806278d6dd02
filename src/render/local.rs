//! Local replies used when the generation backend is unavailable.
//!
//! Phrase choice is seeded from a SHA-256 of the input text, so the same
//! message always yields the same reply for a persona.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::detection::NormalizedText;
use crate::error::GenerationErrorKind;
use crate::persona::PersonaId;

/// Coarse intent of the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    Help,
    Thanks,
    General,
}

impl Intent {
    pub fn classify(text: &str) -> Self {
        let normalized = NormalizedText::new(text);
        let any = |words: &[&str]| words.iter().any(|w| normalized.contains_phrase(w));

        if normalized.is_empty() || any(&["hi", "hello", "hey", "howdy", "good morning", "good evening", "yo"]) {
            Intent::Greeting
        } else if any(&["thanks", "thank you", "cheers", "ty"]) {
            Intent::Thanks
        } else if any(&["help", "support", "assist", "lost", "stuck", "emergency"]) {
            Intent::Help
        } else {
            Intent::General
        }
    }
}

#[derive(Debug, Clone)]
struct PhraseBank {
    greeting: Vec<&'static str>,
    help: Vec<&'static str>,
    thanks: Vec<&'static str>,
    general: Vec<&'static str>,
}

impl PhraseBank {
    fn phrases(&self, intent: Intent) -> &[&'static str] {
        match intent {
            Intent::Greeting => &self.greeting,
            Intent::Help => &self.help,
            Intent::Thanks => &self.thanks,
            Intent::General => &self.general,
        }
    }
}

fn default_bank() -> PhraseBank {
    PhraseBank {
        greeting: vec![
            "Hello! What are you planning today?",
            "Hi there. Where would you like to go?",
        ],
        help: vec![
            "I can help with that. Tell me a little more about where you are.",
            "Let's sort this out. What do you need first?",
        ],
        thanks: vec!["You're welcome.", "Happy to help."],
        general: vec![
            "Good question. I can't look that up right now, but I can suggest where to start.",
            "I'd check the local visitor centre for the latest details on that.",
        ],
    }
}

fn bundled_banks() -> HashMap<PersonaId, PhraseBank> {
    let mut banks = HashMap::new();
    banks.insert(
        PersonaId::Caring,
        PhraseBank {
            greeting: vec!["Hi, it's good to hear from you. How are you doing?"],
            help: vec![
                "I'm sorry you're dealing with this. Let's take it one step at a time.",
                "That sounds stressful. Tell me what's happening and we'll work it out together.",
            ],
            thanks: vec!["Of course. Look after yourself."],
            general: vec!["I'm listening. Tell me more about what you need."],
        },
    );
    banks.insert(
        PersonaId::KidFriendly,
        PhraseBank {
            greeting: vec!["Hi friend! Want to go on an adventure?"],
            help: vec!["Don't worry. Let's ask a grown-up nearby together."],
            thanks: vec!["Yay, you're welcome!"],
            general: vec!["Ooh, good question. Let's find out together."],
        },
    );
    banks.insert(
        PersonaId::YouthDigital,
        PhraseBank {
            greeting: vec!["Yo! What's the plan?", "Hey hey, what are we getting into?"],
            help: vec!["Okay no stress, let's figure it out."],
            thanks: vec!["Anytime fam."],
            general: vec!["Bet, let me think about that one.", "Ngl that's a good one."],
        },
    );
    banks.insert(
        PersonaId::Professional,
        PhraseBank {
            greeting: vec!["Good day. How may I assist you?"],
            help: vec!["Certainly. Please describe the issue and I will advise."],
            thanks: vec!["You are most welcome."],
            general: vec!["I am unable to retrieve full details at the moment. I recommend consulting the official sources."],
        },
    );
    banks.insert(
        PersonaId::Regional,
        PhraseBank {
            greeting: vec!["Howdy! What can I do for ya?"],
            help: vec!["Well now, let's get you sorted out."],
            thanks: vec!["Anytime, partner."],
            general: vec!["Now that's a fine question. Folks round here would start at the visitor centre."],
        },
    );
    banks
}

/// Builds short persona-flavoured replies without the backend.
#[derive(Debug, Clone)]
pub struct LocalResponder {
    banks: HashMap<PersonaId, PhraseBank>,
    fallback: PhraseBank,
}

impl LocalResponder {
    pub fn new() -> Self {
        Self {
            banks: bundled_banks(),
            fallback: default_bank(),
        }
    }

    /// Reply to `text` as `persona`. `failure` adds a short note for
    /// failures the user should know about.
    pub fn reply(&self, text: &str, persona: PersonaId, failure: Option<GenerationErrorKind>) -> String {
        let intent = Intent::classify(text);
        let bank = self.banks.get(&persona).unwrap_or(&self.fallback);
        let phrases = bank.phrases(intent);
        let phrase = phrases
            .get(seed(text) as usize % phrases.len().max(1))
            .copied()
            .unwrap_or_default();

        match failure.and_then(failure_note) {
            Some(note) => format!("{} {}", phrase, note),
            None => phrase.to_string(),
        }
    }
}

impl Default for LocalResponder {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_note(kind: GenerationErrorKind) -> Option<&'static str> {
    match kind {
        GenerationErrorKind::QuotaExceeded => {
            Some("I'm getting a lot of questions right now, so this is a quick answer.")
        }
        GenerationErrorKind::NetworkError => Some("I'm offline at the moment, so this is a quick answer."),
        _ => None,
    }
}

fn seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
