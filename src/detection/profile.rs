//! User profile supplied by the caller alongside each message.

use serde::{Deserialize, Serialize};

use crate::persona::PersonaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgeBracket {
    Child,
    Teen,
    YoungAdult,
    Adult,
    Senior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyComposition {
    Solo,
    Couple,
    WithChildren,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetTier {
    Economy,
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessibilityNeed {
    Mobility,
    Visual,
    Hearing,
    Cognitive,
}

/// What the caller knows about the user. Every field is optional.
///
/// Treated as immutable for the duration of a request; enrichment produces
/// a new value and only ever fills empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_bracket: Option<AgeBracket>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<FamilyComposition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetTier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<AccessibilityNeed>,

    /// Persona pinned by the user. Wins scoring unconditionally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_persona: Option<PersonaId>,
}

impl UserProfile {
    /// Profile with a pinned persona and nothing else.
    pub fn pinned(persona: PersonaId) -> Self {
        Self {
            manual_persona: Some(persona),
            ..Default::default()
        }
    }

    /// Short human-readable summary for prompt conditioning.
    pub fn describe(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(ref region) = self.origin_region {
            parts.push(format!("from {}", region));
        }
        if let Some(age) = self.age_bracket {
            parts.push(format!("age bracket: {}", kebab(&age)));
        }
        if let Some(family) = self.family {
            parts.push(format!("travelling: {}", kebab(&family)));
        }
        if let Some(budget) = self.budget {
            parts.push(format!("budget: {}", kebab(&budget)));
        }
        if let Some(need) = self.accessibility {
            parts.push(format!("accessibility need: {}", kebab(&need)));
        }
        parts
    }
}

fn kebab<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
