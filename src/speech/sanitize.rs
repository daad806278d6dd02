//! Text clean-up before synthesis.

use crate::render::is_emoji;

const ELLIPSIS: &str = "...";

/// Prepare `text` for a voice engine.
///
/// Strips markdown symbols, control characters and emoji, collapses
/// whitespace, and truncates to `max_chars` with a trailing ellipsis.
/// The result never exceeds `max_chars` characters. Returns `None` if
/// nothing speakable remains.
pub fn sanitize(text: &str, max_chars: usize) -> Option<String> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_control() || is_emoji(c) || matches!(c, '*' | '_' | '#' | '`' | '~' | '>' | '|') {
                ' '
            } else {
                c
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if !collapsed.chars().any(char::is_alphanumeric) {
        return None;
    }

    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }

    // No room for the marker: cut hard
    if max_chars <= ELLIPSIS.len() {
        let cut: String = collapsed.chars().take(max_chars).collect();
        let cut = cut.trim_end();
        return cut.chars().any(char::is_alphanumeric).then(|| cut.to_string());
    }

    let keep = max_chars - ELLIPSIS.len();
    let truncated: String = collapsed.chars().take(keep).collect();
    Some(format!("{}{}", truncated.trim_end(), ELLIPSIS))
}
