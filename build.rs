//! Embeds git and toolchain details for `persona-engine version`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = git_output(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_branch = git_output(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_dirty = match git_output(&["status", "--porcelain"]) {
        Some(status) if !status.is_empty() => "true",
        Some(_) => "false",
        None => "unknown",
    };
    let rustc_version = command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".into());

    let vars = [
        ("GIT_HASH", git_hash),
        ("GIT_BRANCH", git_branch),
        ("GIT_DIRTY", git_dirty.to_string()),
        ("BUILD_TIMESTAMP", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("TARGET", env_or_unknown("TARGET")),
        ("PROFILE", env_or_unknown("PROFILE")),
        ("RUSTC_VERSION", rustc_version),
        ("HOST", env_or_unknown("HOST")),
    ];
    for (name, value) in vars {
        println!("cargo:rustc-env=PERSONA_ENGINE_{}={}", name, value);
    }
}

fn env_or_unknown(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| "unknown".to_string())
}

fn git_output(args: &[&str]) -> Option<String> {
    command_output("git", args)
}

/// Trimmed stdout of a successful command.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}
