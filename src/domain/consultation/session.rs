//! Consultation session entity and its conversation log.
//!
//! A session owns its phase/question cursor, the append-only list of turns
//! and the independent list of notes. Ephemeral sessions have no id until
//! they are promoted to durable storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Cursor;
use crate::domain::foundation::{SessionId, Timestamp, UserId, ValidationError};
use crate::domain::phase::Reasoning;

/// Maximum length for session title.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Template used when none is given.
pub const DEFAULT_TEMPLATE: &str = "custom";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    /// Label used in exported transcripts.
    pub fn speaker_label(&self) -> &'static str {
        match self {
            TurnRole::User => "Educator",
            TurnRole::Assistant => "Consultant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown turn role '{}'", other),
            )),
        }
    }
}

/// One message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default)]
    pub reasoning: Reasoning,
    pub timestamp: Timestamp,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>, reasoning: Reasoning) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning,
            timestamp: Timestamp::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content, Reasoning::Unknown)
    }

    pub fn assistant(content: impl Into<String>, reasoning: Reasoning) -> Self {
        Self::new(TurnRole::Assistant, content, reasoning)
    }
}

/// Free-form note kept beside the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub timestamp: Timestamp,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// The unit of work: one guided consultation.
///
/// # Invariants
///
/// - `title` is 1-500 characters, non-blank
/// - `turns` and `notes` are append-only
/// - `completed` is true once the cursor has passed the last phase
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationSession {
    id: Option<SessionId>,
    owner_id: UserId,
    title: String,
    template_type: String,
    cursor: Cursor,
    turns: Vec<Turn>,
    notes: Vec<Note>,
    completed: bool,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ConsultationSession {
    /// Creates a fresh, not yet persisted session at the first question.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the title is blank
    /// - `OutOfRange` if the title is longer than [`MAX_TITLE_LENGTH`]
    pub fn draft(
        owner_id: UserId,
        title: impl Into<String>,
        template_type: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        Self::validate_title(&title)?;

        let template_type = template_type.into();
        let template_type = if template_type.trim().is_empty() {
            DEFAULT_TEMPLATE.to_string()
        } else {
            template_type
        };

        let now = Timestamp::now();
        Ok(Self {
            id: None,
            owner_id,
            title,
            template_type,
            cursor: Cursor::start(),
            turns: Vec::new(),
            notes: Vec::new(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        owner_id: UserId,
        title: String,
        template_type: String,
        cursor: Cursor,
        turns: Vec<Turn>,
        notes: Vec<Note>,
        completed: bool,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id: Some(id),
            owner_id,
            title,
            template_type,
            cursor,
            turns,
            notes,
            completed,
            created_at,
            updated_at,
        }
    }

    pub fn validate_title(title: &str) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        let length = title.chars().count();
        if length > MAX_TITLE_LENGTH {
            return Err(ValidationError::out_of_range(
                "title",
                1,
                MAX_TITLE_LENGTH as i64,
                length as i64,
            ));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Present only once persisted.
    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn template_type(&self) -> &str {
        &self.template_type
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn assign_id(&mut self, id: SessionId) {
        self.id = Some(id);
    }

    pub(crate) fn move_cursor(&mut self, cursor: Cursor, completed: bool) {
        self.cursor = cursor;
        self.completed = completed;
        self.updated_at = Timestamp::now();
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp;
        self.turns.push(turn);
    }

    pub(crate) fn push_note(&mut self, note: Note) {
        self.updated_at = note.timestamp;
        self.notes.push(note);
    }
}
