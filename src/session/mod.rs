//! Conversation state tracking and persona transition announcements.

mod state;
mod transitions;

pub use state::{ConversationState, ConversationStateTracker, EMOTIONAL_CONTEXT_LIMIT};
pub use transitions::TransitionTemplates;
