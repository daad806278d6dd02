//! Persona voice rendering and local fallback replies.

mod local;
mod renderer;
mod rules;

pub use local::{Intent, LocalResponder};
pub use renderer::ResponseRenderer;
pub use rules::{is_emoji, Capitalization, EmojiPolicy, ExclamationPolicy, RenderRules, RuleTable};
