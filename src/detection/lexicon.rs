//! Keyword and phrase tables used by signal extraction.
//!
//! Matching is done on a normalized copy of the message: lowercase, every
//! character other than letters, digits and apostrophes turned into a
//! space, whitespace collapsed. A phrase matches only on word boundaries.

use super::profile::{AccessibilityNeed, AgeBracket, BudgetTier, FamilyComposition};

/// Message text prepared for phrase matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    padded: String,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let mut padded = String::with_capacity(text.len() + 2);
        padded.push(' ');
        let mut last_space = true;
        for c in text.chars().flat_map(char::to_lowercase) {
            // Curly apostrophes are common on phones
            let c = if c == '\u{2019}' { '\'' } else { c };
            if c.is_alphanumeric() || c == '\'' {
                padded.push(c);
                last_space = false;
            } else if !last_space {
                padded.push(' ');
                last_space = true;
            }
        }
        if !last_space {
            padded.push(' ');
        }
        Self { padded }
    }

    /// Whether `phrase` (already lowercase) occurs as whole words.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let needle = format!(" {} ", phrase);
        self.padded.contains(&needle)
    }

    /// First phrase from `phrases` that matches.
    pub fn first_match<'a>(&self, phrases: &'a [String]) -> Option<&'a str> {
        phrases
            .iter()
            .find(|p| self.contains_phrase(p))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.padded.trim().is_empty()
    }
}

/// Phrase tables for every signal category plus profile enrichment hints.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub dialect: Vec<String>,
    pub infantile: Vec<String>,
    pub formal: Vec<String>,
    pub youth_slang: Vec<String>,
    pub distress: Vec<String>,
    pub excitement: Vec<String>,
    pub high_energy: Vec<String>,
    pub relaxed: Vec<String>,
    pub help: Vec<String>,

    pub age_hints: Vec<(AgeBracket, Vec<String>)>,
    pub family_hints: Vec<(FamilyComposition, Vec<String>)>,
    pub budget_hints: Vec<(BudgetTier, Vec<String>)>,
    pub accessibility_hints: Vec<(AccessibilityNeed, Vec<String>)>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self {
            dialect: words(&[
                "y'all", "ya'll", "ain't", "reckon", "fixin to", "howdy", "wee", "aye", "bonnie",
                "lass", "laddie", "arvo", "g'day", "innit", "bloody", "wicked", "mate",
                "cheers mate", "yinz", "youse", "oot", "aboot", "eh bud", "grand so", "craic",
            ]),
            infantile: words(&[
                "mommy", "mummy", "daddy", "tummy", "doggy", "doggie", "kitty", "horsie",
                "pwease", "yummy", "potty", "nap time", "choo choo", "birdie", "boo boo",
                "wanna play", "my toys", "teddy", "sowwy", "pwetty",
            ]),
            formal: words(&[
                "dear sir", "dear madam", "kindly", "regards", "sincerely", "would you be so kind",
                "i would like to inquire", "i wish to inquire", "furthermore", "please advise",
                "respectfully", "herewith", "at your earliest convenience", "i would be grateful",
                "to whom it may concern", "pursuant", "accordingly",
            ]),
            youth_slang: words(&[
                "bruh", "lowkey", "highkey", "no cap", "fr", "ngl", "sus", "bussin", "slay",
                "vibe check", "yeet", "goated", "rizz", "deadass", "finna", "periodt", "fam",
                "tbh", "iykyk", "it's giving", "main character", "slaps", "vibes",
            ]),
            distress: words(&[
                "sad", "worried", "scared", "anxious", "upset", "stressed", "panic",
                "panicking", "afraid", "lonely", "overwhelmed", "hurt", "crying", "depressed",
                "frustrated", "terrible", "awful", "emergency", "stranded", "lost my",
            ]),
            excitement: words(&[
                "excited", "amazing", "awesome", "can't wait", "cant wait", "fire", "wow",
                "incredible", "love it", "thrilled", "fantastic", "yay", "stoked", "so cool",
            ]),
            high_energy: words(&[
                "let's go", "lets go", "pumped", "hyped", "adrenaline", "extreme", "intense",
                "adventure", "rush", "crazy fast", "full send", "go go go",
            ]),
            relaxed: words(&[
                "relax", "relaxing", "chill", "calm", "peaceful", "slow", "quiet", "unwind",
                "cozy", "cosy", "serene", "lazy", "take it easy", "laid back", "tranquil",
            ]),
            help: words(&[
                "help", "support", "assist", "assistance", "guidance", "advice", "need help",
                "please help", "can you help",
            ]),

            age_hints: vec![
                (AgeBracket::Teen, words(&["high school", "my homework", "my teacher", "i'm 15", "i'm 16", "i'm 14"])),
                (AgeBracket::YoungAdult, words(&["college", "uni", "my dorm", "grad school"])),
                (AgeBracket::Senior, words(&["retired", "retirement", "my grandkids", "my grandchildren"])),
            ],
            family_hints: vec![
                (FamilyComposition::WithChildren, words(&["my kids", "my children", "my son", "my daughter", "with kids", "family trip", "toddler", "our baby"])),
                (FamilyComposition::Couple, words(&["my wife", "my husband", "my partner", "honeymoon", "anniversary"])),
                (FamilyComposition::Group, words(&["with friends", "group of", "our team", "the squad"])),
                (FamilyComposition::Solo, words(&["solo", "by myself", "on my own"])),
            ],
            budget_hints: vec![
                (BudgetTier::Economy, words(&["on a budget", "cheap", "affordable", "low cost", "budget"])),
                (BudgetTier::Premium, words(&["luxury", "premium", "five star", "5 star", "first class", "splurge"])),
            ],
            accessibility_hints: vec![
                (AccessibilityNeed::Mobility, words(&["wheelchair", "mobility", "can't walk far", "walker", "cane"])),
                (AccessibilityNeed::Visual, words(&["blind", "low vision", "screen reader"])),
                (AccessibilityNeed::Hearing, words(&["deaf", "hard of hearing", "hearing aid"])),
                (AccessibilityNeed::Cognitive, words(&["dyslexia", "dyslexic", "adhd", "autism", "easy to read"])),
            ],
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

/// First hint group whose phrases match.
pub(crate) fn first_hint<T: Copy>(text: &NormalizedText, hints: &[(T, Vec<String>)]) -> Option<T> {
    hints
        .iter()
        .find(|(_, phrases)| text.first_match(phrases).is_some())
        .map(|(value, _)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        let text = NormalizedText::new("Bruh!!! This is LOWKEY fire, no-cap.");
        assert!(text.contains_phrase("bruh"));
        assert!(text.contains_phrase("lowkey fire"));
        assert!(text.contains_phrase("no cap"));
    }

    #[test]
    fn test_phrases_match_whole_words_only() {
        let text = NormalizedText::new("the chilly wind");
        assert!(!text.contains_phrase("chill"));
        let text = NormalizedText::new("Fresh water");
        assert!(!text.contains_phrase("fr"));
    }

    #[test]
    fn test_curly_apostrophe() {
        let text = NormalizedText::new("Y\u{2019}all ready?");
        assert!(text.contains_phrase("y'all"));
    }

    #[test]
    fn test_empty_text() {
        assert!(NormalizedText::new("  ?!  ").is_empty());
        assert!(!NormalizedText::new("hi").is_empty());
    }

    #[test]
    fn test_first_hint_in_declared_order() {
        let lexicon = Lexicon::builtin();
        let text = NormalizedText::new("Trip with my kids and my wife");
        assert_eq!(
            first_hint(&text, &lexicon.family_hints),
            Some(FamilyComposition::WithChildren)
        );
    }
}
