//! Error types for the Persona Engine
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - Typed generation and speech failures that callers can present
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Generation errors (3xx)
    QuotaExceeded = 300,
    AuthInvalid = 301,
    NetworkError = 302,
    EmptyResponse = 303,
    GenerationUnknown = 304,

    // Speech errors (4xx)
    EmptyText = 400,
    SpeechFailed = 401,
    AudioResource = 402,

    // Persona errors (5xx)
    PersonaNotFound = 500,
    PersonaInvalid = 501,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Generation errors
            400..=499 => 40, // Speech errors
            500..=599 => 50, // Persona errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Generation Errors
// ─────────────────────────────────────────────────────────────────

/// Coarse class of a generation failure.
///
/// This is what callers match on to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationErrorKind {
    QuotaExceeded,
    AuthInvalid,
    NetworkError,
    EmptyResponse,
    Unknown,
}

impl fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationErrorKind::QuotaExceeded => "quota-exceeded",
            GenerationErrorKind::AuthInvalid => "auth-invalid",
            GenerationErrorKind::NetworkError => "network-error",
            GenerationErrorKind::EmptyResponse => "empty-response",
            GenerationErrorKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of an orchestrated generation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The backend kept reporting rate limiting until the retry budget ran out
    #[error("Generation quota exceeded after {attempts} attempt(s)")]
    QuotaExceeded { attempts: u32 },

    /// Credentials were rejected; retrying cannot help
    #[error("Generation backend rejected credentials: {message}")]
    AuthInvalid { message: String },

    /// Transport failure or per-attempt timeout, after retries
    #[error("Generation backend unreachable after {attempts} attempt(s): {message}")]
    Network { message: String, attempts: u32 },

    /// The backend answered but produced no text
    #[error("Generation backend returned an empty response")]
    EmptyResponse,

    /// Anything the backend reported that we do not classify
    #[error("Generation failed: {message}")]
    Unknown { message: String },
}

impl GenerationError {
    /// Get the coarse kind of this error
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            GenerationError::QuotaExceeded { .. } => GenerationErrorKind::QuotaExceeded,
            GenerationError::AuthInvalid { .. } => GenerationErrorKind::AuthInvalid,
            GenerationError::Network { .. } => GenerationErrorKind::NetworkError,
            GenerationError::EmptyResponse => GenerationErrorKind::EmptyResponse,
            GenerationError::Unknown { .. } => GenerationErrorKind::Unknown,
        }
    }

    /// Number of backend attempts spent before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            GenerationError::QuotaExceeded { attempts } => *attempts,
            GenerationError::Network { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Speech Errors
// ─────────────────────────────────────────────────────────────────

/// Failures reported by the speech fallback cascade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// Nothing speakable remained after sanitization
    #[error("No speakable text after sanitization")]
    EmptyText,

    /// Every synthesis tier was tried and failed
    #[error("All speech tiers failed: {reason}")]
    AllTiersFailed { reason: String },

    /// Primary failed and no local synthesizer is installed
    #[error("Primary voice failed and no local synthesizer is available: {reason}")]
    NoLocalSynthesizer { reason: String },

    /// A transient audio resource was released twice
    #[error("Audio resource {id} already released")]
    AlreadyReleased { id: String },

    /// A transient audio resource was used after release
    #[error("Audio resource {id} used after release")]
    UseAfterRelease { id: String },

    /// Writing the transient audio buffer failed
    #[error("Audio resource error: {message}")]
    AudioResource { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Main Error
// ─────────────────────────────────────────────────────────────────

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {}{message}", field_prefix(.field))]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Domain Errors
    // ─────────────────────────────────────────────────────────────

    /// Orchestrated generation failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Speech synthesis failed
    #[error(transparent)]
    Speech(#[from] SpeechError),

    /// Persona override not found
    #[error("Persona not found: {name}")]
    PersonaNotFound { name: String },

    /// Persona override malformed
    #[error("Persona {name} invalid: {reason}")]
    PersonaInvalid { name: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,

            Error::Generation(e) => match e.kind() {
                GenerationErrorKind::QuotaExceeded => ErrorCode::QuotaExceeded,
                GenerationErrorKind::AuthInvalid => ErrorCode::AuthInvalid,
                GenerationErrorKind::NetworkError => ErrorCode::NetworkError,
                GenerationErrorKind::EmptyResponse => ErrorCode::EmptyResponse,
                GenerationErrorKind::Unknown => ErrorCode::GenerationUnknown,
            },

            Error::Speech(e) => match e {
                SpeechError::EmptyText => ErrorCode::EmptyText,
                SpeechError::AllTiersFailed { .. } | SpeechError::NoLocalSynthesizer { .. } => {
                    ErrorCode::SpeechFailed
                }
                SpeechError::AlreadyReleased { .. }
                | SpeechError::UseAfterRelease { .. }
                | SpeechError::AudioResource { .. } => ErrorCode::AudioResource,
            },

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaInvalid { .. } => ErrorCode::PersonaInvalid,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Generation(GenerationError::QuotaExceeded { .. })
                | Error::Generation(GenerationError::Network { .. })
                | Error::Io(_)
                | Error::IoRead { .. }
                | Error::IoWrite { .. }
        )
    }

    /// Check if the error is fatal (session cannot continue until reconfigured)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::Generation(GenerationError::AuthInvalid { .. })
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-engine config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'persona-engine config validate' to see details."
            ),
            Error::ConfigValidation { .. } | Error::Config(_) => Some(
                "Review the configuration file and fix the invalid values."
            ),

            Error::Generation(e) => match e.kind() {
                GenerationErrorKind::QuotaExceeded => Some(
                    "The generation service is rate limiting requests. Wait a minute or lower 'quota.max_requests'."
                ),
                GenerationErrorKind::AuthInvalid => Some(
                    "Check 'generation.api_key' or set PERSONA_ENGINE_API_KEY."
                ),
                GenerationErrorKind::NetworkError => Some(
                    "Check your network connection and 'generation.base_url'."
                ),
                _ => None,
            },

            Error::Speech(SpeechError::NoLocalSynthesizer { .. }) => Some(
                "Install espeak-ng or set 'speech.local_program' to enable offline speech."
            ),
            Error::Speech(SpeechError::EmptyText) => Some(
                "Provide text containing letters or digits."
            ),

            Error::PersonaNotFound { .. } => Some(
                "Run 'persona-engine personas list' to see valid persona slugs."
            ),
            Error::PersonaInvalid { .. } => Some(
                "Fix or delete the persona override file, then run 'persona-engine personas validate'."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

fn field_prefix(field: &Option<String>) -> String {
    field.as_deref().map(|f| format!("{}: ", f)).unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a persona invalid error
    pub fn persona_invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PersonaInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
