//! Request orchestration for the external generation backend.
//!
//! Every call passes through a per-instance quota gate (window limit plus a
//! minimum inter-request gap), is bounded in wall-clock time, and is retried
//! with exponential backoff when the failure class allows it.

mod client;
mod prompt;
mod quota;
mod retry;

pub use client::{Generated, OrchestratorStats, RequestOrchestrator};
pub use prompt::{
    PromptBuilder, PromptSection, SystemPrompt, SECTION_AUDIENCE, SECTION_CONVERSATION,
    SECTION_IDENTITY, SECTION_RULES, SECTION_VOICE,
};
pub use quota::{QuotaGate, QuotaPolicy, QuotaState};
pub use retry::{RetryPolicy, RetrySchedule};
