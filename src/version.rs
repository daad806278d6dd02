//! Build information embedded by `build.rs`.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Short commit hash, or "unknown" outside a git checkout
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    #[serde(skip)]
    git_dirty_str: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc_version: &'static str,
    pub host: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("PERSONA_ENGINE_GIT_HASH"),
            git_branch: env!("PERSONA_ENGINE_GIT_BRANCH"),
            git_dirty_str: env!("PERSONA_ENGINE_GIT_DIRTY"),
            build_timestamp: env!("PERSONA_ENGINE_BUILD_TIMESTAMP"),
            target: env!("PERSONA_ENGINE_TARGET"),
            profile: env!("PERSONA_ENGINE_PROFILE"),
            rustc_version: env!("PERSONA_ENGINE_RUSTC_VERSION"),
            host: env!("PERSONA_ENGINE_HOST"),
        }
    }

    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// e.g. "0.1.0-abc12345" or "0.1.0-abc12345-dirty"
    pub fn full_version(&self) -> String {
        let dirty = if self.git_dirty() { "-dirty" } else { "" };
        format!("{}-{}{}", self.version, self.git_hash, dirty)
    }

    pub fn short_version(&self) -> String {
        format!("{} ({})", self.version, self.git_hash)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "  Branch:   {}", self.git_branch)?;
        writeln!(f, "  Built:    {} ({})", self.build_timestamp, self.profile)?;
        writeln!(f, "  Target:   {}", self.target)?;
        writeln!(f, "  Host:     {}", self.host)?;
        writeln!(f, "  Compiler: {}", self.rustc_version)
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_version_contains_parts() {
        let info = build_info();
        let full = info.full_version();
        assert!(full.starts_with(info.version));
        assert!(full.contains(info.git_hash));
    }

    #[test]
    fn test_display_format() {
        let display = build_info().to_string();
        assert!(display.contains("persona-engine"));
        assert!(display.contains("Target:"));
        assert!(display.contains("Compiler:"));
    }
}
