//! Persona catalog: loads, validates and caches on-disk persona overrides.
//!
//! Overrides live in `<dir>/<slug>.toml`. Parsed files are cached per persona
//! until explicitly invalidated; a missing file is cached as "no override".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{PersonaId, PersonaProfile, Prosody, VoiceProfile};

// ─────────────────────────────────────────────────────────────────
// Override File
// ─────────────────────────────────────────────────────────────────

/// Partial persona profile read from TOML. Unset fields keep the bundled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaOverride {
    /// Which persona this file overrides. Must match the file name.
    pub persona: PersonaId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_voice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosody: Option<Prosody>,
}

impl PersonaOverride {
    /// Empty override for a persona.
    pub fn new(persona: PersonaId) -> Self {
        Self {
            persona,
            display_name: None,
            description: None,
            prompt_voice: None,
            voice: None,
            prosody: None,
        }
    }

    /// Merge the set fields into `profile`.
    pub fn apply_to(&self, profile: &mut PersonaProfile) {
        if let Some(ref name) = self.display_name {
            profile.display_name = name.clone();
        }
        if let Some(ref description) = self.description {
            profile.description = description.clone();
        }
        if let Some(ref prompt_voice) = self.prompt_voice {
            profile.prompt_voice = prompt_voice.clone();
        }
        if let Some(ref voice) = self.voice {
            profile.voice = voice.clone();
        }
        if let Some(prosody) = self.prosody {
            profile.prosody = prosody;
        }
    }
}

/// Metadata about an override present on disk.
#[derive(Debug, Clone)]
pub struct InstalledOverride {
    pub persona: PersonaId,
    pub path: PathBuf,
}

// ─────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────

/// Cached view of the persona override directory.
pub struct PersonaCatalog {
    /// Root directory for overrides: ~/.persona-engine/personas/
    dir: PathBuf,

    /// `None` entries record a confirmed absence.
    cache: RwLock<HashMap<PersonaId, Option<PersonaOverride>>>,
}

impl PersonaCatalog {
    /// Create a catalog over `dir`. Nothing is read until first lookup.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create with default directory (~/.persona-engine/personas/).
    pub fn with_defaults() -> Self {
        let dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".persona-engine")
            .join("personas");
        Self::new(dir)
    }

    /// Get the override directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn override_path(&self, persona: PersonaId) -> PathBuf {
        self.dir.join(format!("{}.toml", persona.slug()))
    }

    // ─────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────

    /// Cached override for a persona, loading it on first access.
    pub fn get(&self, persona: PersonaId) -> Result<Option<PersonaOverride>> {
        if let Some(entry) = self.cache.read().get(&persona) {
            return Ok(entry.clone());
        }

        let path = self.override_path(persona);
        let loaded = if path.exists() {
            Some(self.validate_file(persona, &path)?)
        } else {
            None
        };

        debug!(persona = %persona.slug(), found = loaded.is_some(), "Persona override cached");
        self.cache.write().insert(persona, loaded.clone());
        Ok(loaded)
    }

    /// Whether a lookup for this persona is currently cached.
    pub fn is_cached(&self, persona: PersonaId) -> bool {
        self.cache.read().contains_key(&persona)
    }

    /// List override files present on disk (bypasses the cache).
    pub fn list(&self) -> Vec<InstalledOverride> {
        PersonaId::all()
            .iter()
            .map(|p| (*p, self.override_path(*p)))
            .filter(|(_, path)| path.exists())
            .map(|(persona, path)| InstalledOverride { persona, path })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // Validate / Install
    // ─────────────────────────────────────────────────────────────

    /// Re-read and validate an override from disk, refreshing the cache.
    pub fn validate(&self, persona: PersonaId) -> Result<PersonaOverride> {
        let path = self.override_path(persona);
        if !path.exists() {
            return Err(Error::PersonaNotFound {
                name: persona.slug().to_string(),
            });
        }
        let ov = self.validate_file(persona, &path)?;
        self.cache.write().insert(persona, Some(ov.clone()));
        Ok(ov)
    }

    fn validate_file(&self, persona: PersonaId, path: &Path) -> Result<PersonaOverride> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let ov: PersonaOverride = toml::from_str(&content).map_err(|e| {
            Error::persona_invalid(persona.slug(), format!("Failed to parse TOML: {}", e))
        })?;

        if ov.persona != persona {
            return Err(Error::persona_invalid(
                persona.slug(),
                format!(
                    "File declares persona '{}' but is named for '{}'",
                    ov.persona.slug(),
                    persona.slug()
                ),
            ));
        }

        if let Some(p) = ov.prosody {
            if !(0.25..=4.0).contains(&p.rate) || !(0.25..=4.0).contains(&p.pitch) {
                return Err(Error::persona_invalid(
                    persona.slug(),
                    "prosody rate and pitch must be between 0.25 and 4.0",
                ));
            }
            if !(0.0..=1.0).contains(&p.volume) {
                return Err(Error::persona_invalid(
                    persona.slug(),
                    "prosody volume must be between 0.0 and 1.0",
                ));
            }
        }

        if let Some(ref v) = ov.voice {
            if v.voice_id.trim().is_empty() {
                return Err(Error::persona_invalid(persona.slug(), "voice_id must not be empty"));
            }
        }

        Ok(ov)
    }

    /// Write an override file and drop the cached entry for that persona.
    pub fn install(&self, ov: &PersonaOverride) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::IoWrite {
            path: self.dir.clone(),
            source: e,
        })?;

        let dest = self.override_path(ov.persona);
        let content = toml::to_string_pretty(ov)?;
        fs::write(&dest, content).map_err(|e| Error::IoWrite {
            path: dest.clone(),
            source: e,
        })?;

        self.invalidate(ov.persona);
        info!(persona = %ov.persona.slug(), path = %dest.display(), "Persona override installed");
        Ok(dest)
    }

    // ─────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────

    /// Forget the cached entry for one persona.
    pub fn invalidate(&self, persona: PersonaId) {
        self.cache.write().remove(&persona);
    }

    /// Forget every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.write().clear();
        debug!("Persona override cache cleared");
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
