//! Phase/question cursor arithmetic.
//!
//! The cursor is `(phase_index, question_index)`. A phase index equal to the
//! phase count means the consultation is complete; in that state the
//! question index is always 0.

use crate::domain::foundation::ValidationError;
use crate::domain::phase::PhaseScript;

/// Stored phase key for a finished consultation.
pub const COMPLETE_MARKER: &str = "complete";

/// Position of the next question to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor {
    phase: usize,
    question: usize,
}

/// Result of advancing a cursor by one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub cursor: Cursor,
    pub phase_changed: bool,
}

/// Cursor rebuilt from a stored phase key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredCursor {
    pub cursor: Cursor,
    /// False when the stored key is not part of the script and the cursor
    /// was forced to the completion marker.
    pub recognized: bool,
}

impl Cursor {
    /// First question of the first phase.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn new(phase: usize, question: usize) -> Self {
        Self { phase, question }
    }

    /// Terminal position for the given script.
    pub fn complete(script: &PhaseScript) -> Self {
        Self {
            phase: script.phase_count(),
            question: 0,
        }
    }

    pub fn phase_index(&self) -> usize {
        self.phase
    }

    pub fn question_index(&self) -> usize {
        self.question
    }

    pub fn is_complete(&self, script: &PhaseScript) -> bool {
        self.phase >= script.phase_count()
    }

    /// Moves to the next question, rolling into the next phase once the
    /// current phase's questions are exhausted. Advancing a complete cursor
    /// changes nothing.
    pub fn advanced(&self, script: &PhaseScript) -> Advance {
        let Some(phase) = script.phase(self.phase) else {
            return Advance {
                cursor: Self::complete(script),
                phase_changed: false,
            };
        };

        let next_question = self.question + 1;
        if next_question < phase.question_count() {
            return Advance {
                cursor: Self::new(self.phase, next_question),
                phase_changed: false,
            };
        }

        let next_phase = self.phase + 1;
        let cursor = if next_phase >= script.phase_count() {
            Self::complete(script)
        } else {
            Self::new(next_phase, 0)
        };
        Advance {
            cursor,
            phase_changed: true,
        }
    }

    /// Phase key written to storage, or [`COMPLETE_MARKER`].
    pub fn stored_key(&self, script: &PhaseScript) -> String {
        script
            .phase(self.phase)
            .map(|p| p.key().to_string())
            .unwrap_or_else(|| COMPLETE_MARKER.to_string())
    }

    /// Rebuilds a cursor from a stored phase key and question index.
    ///
    /// Never fails on an unknown key: it lands on the completion marker with
    /// `recognized == false`. A question index past the end of a known
    /// phase is rejected.
    pub fn restore(
        script: &PhaseScript,
        stored_key: &str,
        question_index: usize,
    ) -> Result<RestoredCursor, ValidationError> {
        if stored_key == COMPLETE_MARKER {
            return Ok(RestoredCursor {
                cursor: Self::complete(script),
                recognized: true,
            });
        }

        let Some(phase_index) = script.index_of(stored_key) else {
            return Ok(RestoredCursor {
                cursor: Self::complete(script),
                recognized: false,
            });
        };

        let question_count = script
            .phase(phase_index)
            .map(|p| p.question_count())
            .unwrap_or_default();
        if question_index > question_count {
            return Err(ValidationError::out_of_range(
                "current_question_index",
                0,
                question_count as i64,
                question_index as i64,
            ));
        }

        Ok(RestoredCursor {
            cursor: Self::new(phase_index, question_index),
            recognized: true,
        })
    }
}
