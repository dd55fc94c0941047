//! Plain data handed to document exporters.
//!
//! No formatting happens here; exporters decide layout.

use serde::Serialize;

use super::{ConsultationSession, Note, TurnRole};
use crate::domain::foundation::Timestamp;
use crate::domain::phase::PhaseScript;

/// One turn in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    /// Display name of the phase the turn was annotated with.
    pub phase_label: Option<String>,
    pub role: TurnRole,
    pub content: String,
    pub reasoning_summary: Option<String>,
}

/// Session metadata plus its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub title: String,
    pub template_type: String,
    /// Human-readable consultation type.
    pub template_name: String,
    pub created_at: Timestamp,
    pub completed: bool,
    pub records: Vec<ExportRecord>,
    pub notes: Vec<Note>,
}

impl ExportDocument {
    pub fn from_session(
        session: &ConsultationSession,
        script: &PhaseScript,
        template_name: impl Into<String>,
    ) -> Self {
        let records = session
            .turns()
            .iter()
            .map(|turn| ExportRecord {
                phase_label: turn.reasoning.phase_key().map(|key| {
                    script
                        .phase_by_key(key)
                        .map(|p| p.display_name().to_string())
                        .unwrap_or_else(|| key.to_string())
                }),
                role: turn.role,
                content: turn.content.clone(),
                reasoning_summary: turn.reasoning.rationale().map(|r| r.summary()),
            })
            .collect();

        Self {
            title: session.title().to_string(),
            template_type: session.template_type().to_string(),
            template_name: template_name.into(),
            created_at: *session.created_at(),
            completed: session.is_completed(),
            records,
            notes: session.notes().to_vec(),
        }
    }
}
