//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use persona_engine::config::{self, EngineConfig};
use persona_engine::error::ErrorCode;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    /// `config <action> --config <fixture>` with a clean environment
    fn cmd(&self, action: &str) -> Command {
        let mut cmd = Command::cargo_bin("persona-engine").unwrap();
        cmd.env_remove("PERSONA_ENGINE_CONFIG")
            .env("HOME", self.temp_dir.path())
            .args(["config", action, "--config", self.path()]);
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    let config = EngineConfig::from_file(&fixture.config_path).unwrap();
    assert!(config.generation.enabled);
    assert_eq!(config.quota.max_requests, 15);
    assert_eq!(config.quota.min_gap_ms, 4_000);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.speech.local_program, "espeak-ng");
    assert_eq!(config.logging.level, "warn");
    config.validate().unwrap();
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
model = "llama3.1"

[quota]
max_requests = 30

[speech.elevenlabs]
api_key = "xi-test"
"#,
    );

    let config = EngineConfig::from_file(&fixture.config_path).unwrap();
    assert_eq!(config.generation.backend.model, "llama3.1");
    assert_eq!(config.generation.backend.base_url, "http://localhost:11434/v1");
    assert_eq!(config.quota.max_requests, 30);
    assert_eq!(config.quota.soft_threshold, 10);
    assert_eq!(config.speech.elevenlabs.api_key, "xi-test");
    assert_eq!(config.speech.elevenlabs.timeout_secs, 20);
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
enabled = true
base_url = "https://api.openai.com/v1"
api_key = "sk-test"
model = "gpt-4o-mini"
timeout_secs = 30
temperature = 0.4
max_tokens = 200

[quota]
window_secs = 60
max_requests = 20
soft_threshold = 12
min_gap_ms = 1000

[retry]
max_attempts = 4
base = 2.0
unit_ms = 500
cap_ms = 8000

[speech]
primary_enabled = true
local_program = "espeak"
player = "ffplay"
player_args = ["-nodisp", "-autoexit"]
language = "en-us"

[logging]
level = "debug"
file = "/tmp/persona-engine.log"
rotation = "hourly"
max_files = 3
json_format = true
"#,
    );

    fixture
        .cmd("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

fn assert_invalid(content: &str, field: &str) {
    let fixture = ConfigFixture::new();
    fixture.write_config(content);

    let config = EngineConfig::from_file(&fixture.config_path).unwrap();
    let err = config.validate().unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigValidation);
    assert!(err.to_string().contains(field), "{} not in {}", field, err);
}

#[test]
fn test_invalid_base_url_scheme() {
    assert_invalid("[generation]\nbase_url = \"ftp://example.com\"\n", "generation.base_url");
}

#[test]
fn test_invalid_temperature() {
    assert_invalid("[generation]\ntemperature = 3.5\n", "generation.temperature");
}

#[test]
fn test_invalid_soft_threshold() {
    assert_invalid("[quota]\nmax_requests = 5\nsoft_threshold = 9\n", "quota.soft_threshold");
}

#[test]
fn test_invalid_zero_attempts() {
    assert_invalid("[retry]\nmax_attempts = 0\n", "retry.max_attempts");
}

#[test]
fn test_invalid_auto_detect_threshold() {
    assert_invalid(
        "[detection.weights]\nauto_detect_threshold = 90\n",
        "detection.weights.auto_detect_threshold",
    );
}

#[test]
fn test_invalid_log_level() {
    assert_invalid("[logging]\nlevel = \"loud\"\n", "logging.level");
}

#[test]
fn test_invalid_config_fails_cli() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[speech]\nmax_chars = 2\n");

    fixture
        .cmd("validate")
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("speech.max_chars"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation\nmodel = \"x\"\n");

    let err = EngineConfig::from_file(&fixture.config_path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigParseError);

    fixture
        .cmd("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_explicit_missing_path() {
    let err = EngineConfig::load(Some("/nonexistent/dir/engine.toml")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
model = "custom-model-7b"

[quota]
max_requests = 42
soft_threshold = 40
"#,
    );

    fixture
        .cmd("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("custom-model-7b"))
        .stdout(predicate::str::contains("max_requests = 42"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_generated_default_config_is_valid() {
    let fixture = ConfigFixture::new();
    fixture.write_config(&config::generate_default_config());

    let config = EngineConfig::from_file(&fixture.config_path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.quota.max_requests, 15);
}

#[test]
fn test_init_config_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation]\nmodel = \"old\"\n");

    let err = config::init_config(Some(fixture.path()), false).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    let written = config::init_config(Some(fixture.path()), true).unwrap();
    assert_eq!(written, fixture.config_path);
    let content = fs::read_to_string(&fixture.config_path).unwrap();
    assert!(!content.contains("\"old\""));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[generation]
model = "file-model"
"#,
    );

    fixture
        .cmd("show")
        .env("PERSONA_ENGINE_MODEL", "env-model")
        .env("PERSONA_ENGINE_MAX_ATTEMPTS", "5")
        .assert()
        .success()
        .stdout(predicate::str::contains("env-model"))
        .stdout(predicate::str::contains("file-model").not())
        .stdout(predicate::str::contains("max_attempts = 5"));
}

#[test]
fn test_env_override_is_validated() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    fixture
        .cmd("validate")
        .env("PERSONA_ENGINE_LOG_LEVEL", "chatty")
        .assert()
        .failure()
        .stderr(predicate::str::contains("logging.level"));
}

#[test]
fn test_unparseable_env_number_is_ignored() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    fixture
        .cmd("show")
        .env("PERSONA_ENGINE_MAX_REQUESTS", "lots")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_requests = 15"));
}

// ─────────────────────────────────────────────────────────────────
// Path Expansion Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[personas]
dir = "~/my-personas"
"#,
    );

    let output = fixture.cmd("show").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

    assert!(!stdout.contains("dir = \"~"));
    assert!(stdout.contains("my-personas"));
}
