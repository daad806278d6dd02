//! Persona Engine
//!
//! Routes free-text messages to a response persona, generates replies
//! through a throttled and retried backend, renders them in the persona's
//! voice and speaks them through a primary voice service with a local
//! fallback.
//!
//! The usual entry point is [`engine::PersonaEngine`].

pub mod backend;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod persona;
pub mod render;
pub mod session;
pub mod speech;
pub mod version;

pub use engine::{EngineBuilder, EngineReply, PersonaEngine, ReplySource};
pub use error::{Error, GenerationError, GenerationErrorKind, Result, SpeechError};
