//! Configuration for the Persona Engine
//!
//! Sources, highest precedence first:
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_ENGINE_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::backend::{GenerationOptions, OpenAiConfig};
use crate::detection::{ExtractorThresholds, ScoringWeights};
use crate::error::{Error, Result};
use crate::logging::LogRotation;
use crate::orchestrator::{QuotaPolicy, RetryPolicy};
use crate::speech::{ElevenLabsConfig, DEFAULT_MAX_CHARS};

const ENV_PREFIX: &str = "PERSONA_ENGINE_";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: DetectionSettings,
    pub generation: GenerationSettings,
    pub quota: QuotaPolicy,
    pub retry: RetryPolicy,
    pub speech: SpeechSettings,
    pub personas: PersonaSettings,
    pub logging: LoggingSettings,
}

/// Signal extraction thresholds and scoring weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub thresholds: ExtractorThresholds,
    pub weights: ScoringWeights,
}

/// External generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// When false, every reply comes from the local responder
    pub enabled: bool,

    #[serde(flatten)]
    pub backend: OpenAiConfig,

    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            enabled: true,
            backend: OpenAiConfig::default(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

/// Speech cascade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Use the primary network voice. Needs `elevenlabs.api_key`.
    pub primary_enabled: bool,

    pub elevenlabs: ElevenLabsConfig,

    /// espeak-compatible program for offline synthesis
    pub local_program: String,

    /// Player program and its arguments for primary audio
    pub player: String,
    pub player_args: Vec<String>,

    pub max_chars: usize,

    /// Default language passed to the local synthesizer
    pub language: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            primary_enabled: true,
            elevenlabs: ElevenLabsConfig::default(),
            local_program: "espeak-ng".to_string(),
            player: "mpg123".to_string(),
            player_args: vec!["-q".to_string()],
            max_chars: DEFAULT_MAX_CHARS,
            language: "en".to_string(),
        }
    }
}

/// Persona override directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    pub dir: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            dir: "~/.persona-engine/personas".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn, error
    pub level: String,

    /// Log file path (unset = console only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    pub rotation: LogRotation,

    /// Rotated files to keep
    pub max_files: u32,

    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            rotation: LogRotation::Daily,
            max_files: 5,
            json_format: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load from file (explicit or discovered), then env, then validate.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without env overrides or validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })?;
        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Explicit paths must exist; otherwise the first standard location found.
    pub fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = Self::search_paths();
        let found = search_paths.into_iter().find(|p| p.exists());
        match found {
            Some(ref path) => debug!(path = %path.display(), "Found configuration file"),
            None => debug!("No configuration file found, using defaults"),
        }
        Ok(found)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("persona-engine.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("persona-engine").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".persona-engine").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/persona-engine/config.toml"));
        paths
    }

    fn apply_env_overrides(&mut self) {
        // Generation
        if let Some(val) = env_var("ENABLED") {
            self.generation.enabled = parse_bool(&val);
        }
        if let Some(val) = env_var("BASE_URL") {
            self.generation.backend.base_url = val;
        }
        if let Some(val) = env_var("API_KEY") {
            self.generation.backend.api_key = val;
        }
        if let Some(val) = env_var("MODEL") {
            self.generation.backend.model = val;
        }
        if let Some(n) = env_var("TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.generation.backend.timeout_secs = n;
        }

        // Quota and retry
        if let Some(n) = env_var("MAX_REQUESTS").and_then(|v| v.parse().ok()) {
            self.quota.max_requests = n;
        }
        if let Some(n) = env_var("MIN_GAP_MS").and_then(|v| v.parse().ok()) {
            self.quota.min_gap_ms = n;
        }
        if let Some(n) = env_var("MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.retry.max_attempts = n;
        }

        // Speech
        if let Some(val) = env_var("VOICE_API_KEY") {
            self.speech.elevenlabs.api_key = val;
        }
        if let Some(val) = env_var("LOCAL_PROGRAM") {
            self.speech.local_program = val;
        }
        if let Some(val) = env_var("LANGUAGE") {
            self.speech.language = val;
        }

        // Personas and logging
        if let Some(val) = env_var("PERSONA_DIR") {
            self.personas.dir = val;
        }
        if let Some(val) = env_var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = env_var("LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = env_var("LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }
    }

    fn expand_paths(&mut self) {
        self.personas.dir = expand_path(&self.personas.dir);
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Check every section for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_url("generation.base_url", &self.generation.backend.base_url)?;
        validate_url("speech.elevenlabs.base_url", &self.speech.elevenlabs.base_url)?;

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::config_field_invalid(
                "generation.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::config_field_invalid("generation.max_tokens", "must be greater than 0"));
        }

        self.quota.validate()?;
        self.retry.validate()?;

        let w = &self.detection.weights;
        let weakest_signal = [
            w.dialect,
            w.infantile,
            w.formal,
            w.youth_slang,
            w.distress,
            w.excitement,
            w.high_energy,
            w.relaxed,
        ]
        .into_iter()
        .min()
        .unwrap_or(0);
        if w.auto_detect_threshold >= weakest_signal {
            return Err(Error::config_field_invalid(
                "detection.weights.auto_detect_threshold",
                "must be lower than every signal weight",
            ));
        }

        if self.speech.max_chars < 4 {
            return Err(Error::config_field_invalid("speech.max_chars", "must be at least 4"));
        }
        if self.speech.language.trim().is_empty() {
            return Err(Error::config_field_invalid("speech.language", "cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "invalid log level '{}', must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    pub fn persona_dir(&self) -> PathBuf {
        PathBuf::from(&self.personas.dir)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::config_field_invalid(field, format!("invalid URL '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config_field_invalid(
            field,
            format!("unsupported scheme '{}', expected http or https", other),
        )),
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location used by `config init`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona-engine")
        .join("config.toml")
}

/// Write a commented default configuration file. Returns its path.
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Default configuration with comments
pub fn generate_default_config() -> String {
    r#"# Persona Engine Configuration

[generation]
# Set to false to answer every message with local replies
enabled = true

# OpenAI-compatible endpoint (OpenAI, Ollama, vLLM, LM Studio, ...)
base_url = "http://localhost:11434/v1"

# API key (or PERSONA_ENGINE_API_KEY); empty for local servers
api_key = ""
model = "llama3"
timeout_secs = 60
temperature = 0.8
max_tokens = 400

[quota]
# Rolling window and hard request limit
window_secs = 60
max_requests = 15

# Past this count, each request sleeps overage_step_ms per extra request
soft_threshold = 10
overage_step_ms = 2000
max_overage_delay_ms = 10000

# Minimum gap between any two requests
min_gap_ms = 4000

[retry]
# Attempts per message (quota and network errors only)
max_attempts = 3

# delay = min(cap_ms, base^attempt * unit_ms)
base = 2.0
unit_ms = 1000
cap_ms = 16000
attempt_timeout_ms = 30000

[speech]
primary_enabled = true
local_program = "espeak-ng"
player = "mpg123"
player_args = ["-q"]
max_chars = 1000
language = "en"

[speech.elevenlabs]
base_url = "https://api.elevenlabs.io/v1"
# API key (or PERSONA_ENGINE_VOICE_API_KEY)
api_key = ""
model_id = "eleven_multilingual_v2"
timeout_secs = 20

[personas]
# Directory of <slug>.toml persona overrides
dir = "~/.persona-engine/personas"

[logging]
# trace, debug, info, warn, error
level = "warn"

# file = "~/.persona-engine/logs/engine.log"

# hourly, daily, never
rotation = "daily"
max_files = 5
json_format = false
"#
    .to_string()
}
