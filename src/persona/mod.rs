//! Persona system: the closed set of response voices and their data tables.
//!
//! Each persona carries prompt conditioning, voice parameters for the
//! primary speech service and prosody for local synthesis. Tables are
//! immutable once built; adding a persona is a data change.

pub mod catalog;
pub mod registry;
pub mod types;

pub use catalog::{InstalledOverride, PersonaCatalog, PersonaOverride};
pub use registry::PersonaRegistry;
pub use types::{PersonaId, PersonaProfile, Prosody, VoiceProfile};
