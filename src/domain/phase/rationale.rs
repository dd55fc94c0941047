//! Pedagogical rationale attached to phases and conversation turns.

use serde::{Deserialize, Serialize};

/// Why a phase asks what it asks: framework, justification and sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    pub framework: String,
    /// Short justification ("why this matters").
    pub rationale: String,
    pub principle: String,
    pub sources: Vec<String>,
    /// How the answers shape later recommendations.
    pub connection: String,
    pub confidence_label: String,
    pub confidence_rationale: String,
}

impl Rationale {
    /// One-line summary used in exports: `"{framework}: {rationale}"`.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.framework, self.rationale)
    }
}

/// Reasoning recorded alongside a turn.
///
/// Turns produced outside any phase (user input, free-form replies) carry
/// `Unknown` instead of an empty record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reasoning {
    #[default]
    Unknown,
    Annotated {
        phase_key: String,
        rationale: Rationale,
    },
}

impl Reasoning {
    /// Annotates with the rationale of the given phase.
    pub fn annotated(phase_key: impl Into<String>, rationale: Rationale) -> Self {
        Reasoning::Annotated {
            phase_key: phase_key.into(),
            rationale,
        }
    }

    /// Phase key this reasoning belongs to, if any.
    pub fn phase_key(&self) -> Option<&str> {
        match self {
            Reasoning::Unknown => None,
            Reasoning::Annotated { phase_key, .. } => Some(phase_key),
        }
    }

    pub fn rationale(&self) -> Option<&Rationale> {
        match self {
            Reasoning::Unknown => None,
            Reasoning::Annotated { rationale, .. } => Some(rationale),
        }
    }
}
