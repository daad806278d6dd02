//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command for the binary, pinned to a config file inside `dir`
fn engine_cmd(dir: &TempDir) -> Command {
    let config = common::write_config(dir.path(), common::OFFLINE_CONFIG);
    let mut cmd = Command::cargo_bin("persona-engine").unwrap();
    cmd.env_remove("PERSONA_ENGINE_CONFIG")
        .env("HOME", dir.path())
        .arg("--config")
        .arg(config);
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    Command::cargo_bin("persona-engine")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Persona Engine"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("speak"))
        .stdout(predicate::str::contains("personas"));
}

#[test]
fn test_version_command() {
    Command::cargo_bin("persona-engine")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-engine"))
        .stdout(predicate::str::contains("Compiler:"));
}

#[test]
fn test_invalid_subcommand() {
    Command::cargo_bin("persona-engine")
        .unwrap()
        .arg("dance")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─────────────────────────────────────────────────────────────────
// Detect
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_detect_youth_slang() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["detect", "bruh this is lowkey fire no cap"])
        .assert()
        .success()
        .stdout(predicate::str::contains("persona:    youth-digital"));
}

#[test]
fn test_detect_pinned_persona_json() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["detect", "anything at all", "--persona", "calm", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"persona\": \"calm\""))
        .stdout(predicate::str::contains("\"confidence\": 100"))
        .stdout(predicate::str::contains("manual override"));
}

#[test]
fn test_detect_unknown_persona_fails() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["detect", "hi", "--persona", "pirate"])
        .assert()
        .failure()
        .code(50)
        .stderr(predicate::str::contains("E500"));
}

#[test]
fn test_detect_bad_age_fails() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["detect", "hi", "--age", "ancient"])
        .assert()
        .failure()
        .code(10);
}

// ─────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_chat_offline_answers_every_line() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["chat", "--offline"])
        .write_stdin("hello there\nthanks so much\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("> ").count(2));
}

#[test]
fn test_chat_mock_json_lines() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["chat", "--mock", "--json", "--persona", "professional"])
        .write_stdin("hey\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"selected_persona\":\"professional\""))
        .stdout(predicate::str::contains("\"kind\":\"generated\""));
}

#[test]
fn test_chat_empty_stdin() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["chat", "--offline"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ─────────────────────────────────────────────────────────────────
// Speak
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_speak_empty_text_rejected() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["speak", "🔥 ** 🔥"])
        .assert()
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E400"));
}

#[test]
fn test_speak_without_any_tier_fails() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["speak", "hello", "--local-only"])
        .assert()
        .failure()
        .code(40)
        .stderr(predicate::str::contains("no local synthesizer"));
}

// ─────────────────────────────────────────────────────────────────
// Personas
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_personas_list() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["personas", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auto-detect"))
        .stdout(predicate::str::contains("youth-digital"))
        .stdout(predicate::str::contains("bundled"));
}

#[test]
fn test_personas_show() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["personas", "show", "caring"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id = \"caring\""))
        .stdout(predicate::str::contains("[prosody]"));
}

#[test]
fn test_personas_override_listed_and_validated() {
    let dir = TempDir::new().unwrap();
    let personas = dir.path().join("personas");
    std::fs::create_dir_all(&personas).unwrap();
    std::fs::write(
        personas.join("calm.toml"),
        "persona = \"calm\"\ndisplay_name = \"Quiet Guide\"\n",
    )
    .unwrap();

    engine_cmd(&dir)
        .args(["personas", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quiet Guide"))
        .stdout(predicate::str::contains("override"));

    engine_cmd(&dir)
        .args(["personas", "validate", "calm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_personas_validate_missing_override() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["personas", "validate", "teen"])
        .assert()
        .failure()
        .code(50);
}

#[test]
fn test_broken_override_is_reported() {
    let dir = TempDir::new().unwrap();
    let personas = dir.path().join("personas");
    std::fs::create_dir_all(&personas).unwrap();
    std::fs::write(personas.join("teen.toml"), "persona = \"calm\"\n").unwrap();

    engine_cmd(&dir)
        .args(["personas", "list"])
        .assert()
        .failure()
        .code(50)
        .stderr(predicate::str::contains("teen"));
}

// ─────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show() {
    let dir = TempDir::new().unwrap();
    engine_cmd(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[quota]"))
        .stdout(predicate::str::contains("[retry]"))
        .stdout(predicate::str::contains("[speech]"));
}

#[test]
fn test_config_validate_missing_file() {
    Command::cargo_bin("persona-engine")
        .unwrap()
        .args(["config", "validate", "--config", "/nonexistent/persona-engine.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}

#[test]
fn test_config_validate_rejects_invalid() {
    let dir = TempDir::new().unwrap();
    let path = common::write_config(dir.path(), common::INVALID_CONFIG);
    Command::cargo_bin("persona-engine")
        .unwrap()
        .args(["config", "validate", "--config"])
        .arg(path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E102"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("engine.toml");

    Command::cargo_bin("persona-engine")
        .unwrap()
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));
    assert!(target.exists());

    // second run without --force refuses
    Command::cargo_bin("persona-engine")
        .unwrap()
        .args(["config", "init", "--path"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
