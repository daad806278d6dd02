//! Deterministic persona voice transformation.
//!
//! `render` applies, in order: vocabulary substitutions, the emoji policy,
//! sentence-length breaking, the exclamation policy, capitalization, then
//! opener/closer and the signature emoji. Same input, same output.

use std::sync::Arc;

use crate::persona::PersonaId;

use super::rules::{is_emoji, Capitalization, EmojiPolicy, ExclamationPolicy, RenderRules, RuleTable};

/// Applies the persona rule table to raw reply text.
#[derive(Debug, Clone)]
pub struct ResponseRenderer {
    table: Arc<RuleTable>,
}

impl ResponseRenderer {
    pub fn new(table: Arc<RuleTable>) -> Self {
        Self { table }
    }

    /// Style `raw` for `persona`. Personas without rules get `raw` back.
    pub fn render(&self, raw: &str, persona: PersonaId) -> String {
        match self.table.get(persona) {
            Some(rules) => apply(raw, rules),
            None => raw.to_string(),
        }
    }

    /// Like [`render`](Self::render) but keyed by slug; unknown slugs are identity.
    pub fn render_slug(&self, raw: &str, slug: &str) -> String {
        match slug.parse::<PersonaId>() {
            Ok(persona) => self.render(raw, persona),
            Err(_) => raw.to_string(),
        }
    }
}

impl Default for ResponseRenderer {
    fn default() -> Self {
        Self::new(Arc::new(RuleTable::builtin()))
    }
}

fn apply(raw: &str, rules: &RenderRules) -> String {
    let mut text = substitute(raw, rules);
    text = filter_emoji(&text, &rules.emoji);
    text = reflow(&text, rules.max_sentence_words);
    text = punctuate(&text, rules.exclamation);
    if rules.capitalization == Capitalization::Sentence {
        text = capitalize_sentences(&text);
    }

    if let Some(ref opener) = rules.opener {
        if !text.starts_with(opener.as_str()) {
            text = if text.is_empty() {
                opener.clone()
            } else {
                format!("{} {}", opener, text)
            };
        }
    }
    if let Some(ref closer) = rules.closer {
        if !text.ends_with(closer.as_str()) {
            text = if text.is_empty() {
                closer.clone()
            } else {
                format!("{} {}", text, closer)
            };
        }
    }
    if let Some(sig) = rules.signature_emoji {
        if !text.contains(sig) {
            text.push(' ');
            text.push(sig);
        }
    }

    text.trim().to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn substitute(text: &str, rules: &RenderRules) -> String {
    if rules.substitutions.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        match rules.substitution(word) {
            Some(replacement) => out.push_str(&match_case(word, replacement)),
            None => out.push_str(word),
        }
        word.clear();
    };

    for c in text.chars() {
        if is_word_char(c) {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

/// Carry the original word's leading capital over to the replacement.
fn match_case(original: &str, replacement: &str) -> String {
    let starts_upper = original.chars().next().map_or(false, char::is_uppercase);
    if starts_upper {
        capitalize_first(replacement)
    } else {
        replacement.to_string()
    }
}

fn filter_emoji(text: &str, policy: &EmojiPolicy) -> String {
    match policy {
        EmojiPolicy::Keep => text.to_string(),
        EmojiPolicy::Strip => text.chars().filter(|c| !is_emoji(*c)).collect(),
        EmojiPolicy::Palette(allowed) => text
            .chars()
            .filter(|c| !is_emoji(*c) || allowed.contains(c))
            .collect(),
    }
}

fn punctuate(text: &str, policy: ExclamationPolicy) -> String {
    match policy {
        ExclamationPolicy::Preserve => text.to_string(),
        ExclamationPolicy::Soften => {
            let mut out = String::with_capacity(text.len());
            let mut prev_bang = false;
            for c in text.chars() {
                if c == '!' {
                    if !prev_bang {
                        out.push('.');
                    }
                    prev_bang = true;
                } else {
                    out.push(c);
                    prev_bang = false;
                }
            }
            out
        }
        ExclamationPolicy::Amplify => {
            let chars: Vec<char> = text.chars().collect();
            chars
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let prev_dot = i > 0 && chars[i - 1] == '.';
                    let next = chars.get(i + 1).copied();
                    let ends_sentence = next.map_or(true, char::is_whitespace);
                    if c == '.' && !prev_dot && next != Some('.') && ends_sentence {
                        '!'
                    } else {
                        c
                    }
                })
                .collect()
        }
    }
}

fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?'])
}

/// Break overlong sentences and collapse runs of spaces, line by line.
fn reflow(text: &str, max_words: Option<usize>) -> String {
    text.lines()
        .map(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some(max) = max_words else {
                return words.join(" ");
            };

            let mut out: Vec<String> = Vec::with_capacity(words.len());
            let mut count = 0;
            let mut capitalize_next = false;
            for (i, word) in words.iter().enumerate() {
                let mut word = if capitalize_next {
                    capitalize_first(word)
                } else {
                    word.to_string()
                };
                capitalize_next = false;
                count += 1;

                if ends_sentence(&word) {
                    count = 0;
                } else if count >= max && i + 1 < words.len() {
                    let trimmed = word.trim_end_matches([',', ';', ':']).len();
                    word.truncate(trimmed);
                    word.push('.');
                    count = 0;
                    capitalize_next = true;
                }
                out.push(word);
            }
            out.join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_start = true;
    let mut after_terminal = false;
    for c in text.chars() {
        if at_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            at_start = false;
            after_terminal = false;
            continue;
        }
        if c.is_alphanumeric() {
            at_start = false;
        }
        if matches!(c, '.' | '!' | '?') {
            after_terminal = true;
        } else if c.is_whitespace() {
            if after_terminal || c == '\n' {
                at_start = true;
            }
        } else {
            after_terminal = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(raw: &str, persona: PersonaId) -> String {
        ResponseRenderer::default().render(raw, persona)
    }

    #[test]
    fn test_auto_detect_is_identity() {
        let raw = "hey  there!!! 🔥 ok.";
        assert_eq!(render(raw, PersonaId::AutoDetect), raw);
    }

    #[test]
    fn test_unknown_slug_is_identity() {
        let renderer = ResponseRenderer::default();
        assert_eq!(renderer.render_slug("Anything goes!", "pirate"), "Anything goes!");
        assert_eq!(
            renderer.render_slug("hey, gonna help", "professional"),
            renderer.render("hey, gonna help", PersonaId::Professional)
        );
    }

    #[test]
    fn test_professional() {
        let out = render("hey! gonna check that for you 🔥", PersonaId::Professional);
        assert_eq!(out, "Hello. Going to check that for you");
    }

    #[test]
    fn test_substitution_whole_words_only() {
        let out = render("Goodness, good food", PersonaId::Cheerful);
        assert_eq!(out, "Goodness, great food 😊");
    }

    #[test]
    fn test_palette_filters_foreign_emoji() {
        let out = render("Lovely day 🌞🔥", PersonaId::Cheerful);
        assert!(out.contains('🌞'));
        assert!(!out.contains('🔥'));
    }

    #[test]
    fn test_amplify_keeps_ellipsis_and_decimals() {
        let out = render("It costs 3.50 today... come along.", PersonaId::Cheerful);
        assert_eq!(out, "It costs 3.50 today... come along! 😊");
    }

    #[test]
    fn test_kid_friendly_breaks_long_sentences() {
        let raw = "the museum has a large room with dinosaurs and rockets and trains and lots of other things to see";
        let out = render(raw, PersonaId::KidFriendly);
        let first_sentence = out.split('!').next().unwrap();
        assert!(first_sentence.split_whitespace().count() <= 12);
        assert!(out.starts_with("The museum has a big room"));
        assert!(out.ends_with('🌈'));
    }

    #[test]
    fn test_opener_and_closer_not_duplicated() {
        let once = render("Let's go! Up the hill.", PersonaId::Energetic);
        assert_eq!(once.matches("Let's go!").count(), 1);

        let calm = render("Take your time.", PersonaId::Calm);
        assert_eq!(calm.matches("Take your time.").count(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let raw = "Honestly the food there is amazing, bring friends!";
        for p in PersonaId::all() {
            assert_eq!(render(raw, *p), render(raw, *p));
        }
        assert_eq!(
            render(raw, PersonaId::YouthDigital),
            "Ngl the food there is fire, bring fam! 💯"
        );
    }

    #[test]
    fn test_accessible_guide() {
        let out = render("please utilize the lift!! it is approximately 20m away.", PersonaId::AccessibleGuide);
        assert_eq!(out, "Please use the lift. It is about 20m away.");
    }
}
