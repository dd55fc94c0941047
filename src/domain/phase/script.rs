//! Phase script model: ordered phases, their questions and rationale.

use std::collections::HashSet;

use super::Rationale;
use crate::domain::foundation::ValidationError;

/// One themed group of sequential questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDefinition {
    key: String,
    display_name: String,
    questions: Vec<String>,
    rationale: Rationale,
}

impl PhaseDefinition {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        questions: Vec<String>,
        rationale: Rationale,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            questions,
            rationale,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    pub fn rationale(&self) -> &Rationale {
        &self.rationale
    }
}

/// Immutable, ordered catalog of phases.
///
/// Loaded once at startup and shared by reference; nothing mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseScript {
    phases: Vec<PhaseDefinition>,
    fallback: Rationale,
}

impl PhaseScript {
    /// Builds a script, rejecting blank or duplicate keys and phases
    /// without questions.
    ///
    /// `complete` is reserved: it is the stored marker for a finished
    /// consultation.
    pub fn new(phases: Vec<PhaseDefinition>, fallback: Rationale) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for phase in &phases {
            if phase.key.trim().is_empty() {
                return Err(ValidationError::empty_field("phase.key"));
            }
            if phase.key == crate::domain::consultation::COMPLETE_MARKER {
                return Err(ValidationError::invalid_format(
                    "phase.key",
                    "'complete' is reserved for finished consultations",
                ));
            }
            if !seen.insert(phase.key.as_str()) {
                return Err(ValidationError::invalid_format(
                    "phase.key",
                    format!("duplicate key '{}'", phase.key),
                ));
            }
            if phase.questions.is_empty() {
                return Err(ValidationError::empty_field(format!(
                    "phase '{}' questions",
                    phase.key
                )));
            }
        }
        Ok(Self { phases, fallback })
    }

    /// Builds a script from compiled-in data whose shape is covered by tests.
    pub(crate) fn from_catalog(phases: Vec<PhaseDefinition>, fallback: Rationale) -> Self {
        Self { phases, fallback }
    }

    /// Ordered phase keys.
    pub fn phase_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.phases.iter().map(|p| p.key.as_str())
    }

    pub fn phases(&self) -> &[PhaseDefinition] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phase(&self, index: usize) -> Option<&PhaseDefinition> {
        self.phases.get(index)
    }

    pub fn phase_by_key(&self, key: &str) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|p| p.key == key)
    }

    /// Position of a phase key in the ordered list.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.key == key)
    }

    /// Sum of question counts over all phases.
    pub fn total_questions(&self) -> usize {
        self.phases.iter().map(PhaseDefinition::question_count).sum()
    }

    /// Rationale for a question; unknown phase keys get the generic record.
    ///
    /// Rationale is authored per phase, so every question index within a
    /// known phase shares it.
    pub fn rationale_for(&self, phase_key: &str, _question_index: usize) -> &Rationale {
        self.phase_by_key(phase_key)
            .map(PhaseDefinition::rationale)
            .unwrap_or(&self.fallback)
    }

    /// Generic "inclusive design" rationale.
    pub fn fallback_rationale(&self) -> &Rationale {
        &self.fallback
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn rationale(framework: &str) -> Rationale {
        Rationale {
            framework: framework.to_string(),
            rationale: format!("{} matters", framework),
            principle: "Design for the margins".to_string(),
            sources: vec!["CAST UDL Guidelines".to_string()],
            connection: "Shapes later recommendations".to_string(),
            confidence_label: "High".to_string(),
            confidence_rationale: "Well established".to_string(),
        }
    }

    /// Script with the given question count per phase, keys `p0`, `p1`, ...
    pub fn script_with_counts(counts: &[usize]) -> PhaseScript {
        let phases = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                PhaseDefinition::new(
                    format!("p{}", i),
                    format!("Phase {}", i),
                    (0..count).map(|q| format!("Question {}.{}", i, q)).collect(),
                    rationale(&format!("Framework {}", i)),
                )
            })
            .collect();
        PhaseScript::new(phases, rationale("Inclusive Design")).unwrap()
    }
}
