//! Session store port.
//!
//! Defines the contract for persisting consultation sessions and their
//! conversation logs. The engine only relies on these operations, never on a
//! particular storage technology.
//!
//! # Design
//!
//! - **Key-based cursor**: the phase position is stored as a phase key (or
//!   `complete`), the engine rebuilds indices from the script
//! - **Append-only logs**: turns and notes are only ever appended
//! - **Owner-scoped listing**: most recent first

use async_trait::async_trait;

use crate::domain::consultation::{Note, Turn};
use crate::domain::foundation::{DomainError, SessionId, Timestamp, UserId};

/// Repository port for consultation sessions.
///
/// Implementations must:
/// - Serialize writes per session row
/// - Bump `updated_at` on every update and append
/// - Return `SessionNotFound` for operations on unknown ids
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create(&self, new_session: NewSession) -> Result<StoredSession, DomainError>;

    /// Find a session with its turns and notes.
    ///
    /// Returns `None` if not found.
    async fn get_by_id(&self, id: &SessionId) -> Result<Option<StoredSession>, DomainError>;

    /// Overwrite the given fields.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, id: &SessionId, update: SessionUpdate) -> Result<(), DomainError>;

    /// Delete a session with its turns and notes.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if session doesn't exist
    async fn delete(&self, id: &SessionId) -> Result<(), DomainError>;

    /// Append a turn at the end of the log.
    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> Result<(), DomainError>;

    /// Append a note at the end of the notes list.
    async fn append_note(&self, id: &SessionId, note: &Note) -> Result<(), DomainError>;

    /// Sessions owned by a user, most recently updated first.
    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<SessionSummary>, DomainError>;
}

/// Fields for a new session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub owner_id: UserId,
    pub title: String,
    pub template_type: String,
    /// Phase key the cursor starts on.
    pub current_phase: String,
    pub current_question_index: usize,
    pub completed: bool,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub current_phase: Option<String>,
    pub current_question_index: Option<usize>,
    pub completed: Option<bool>,
}

impl SessionUpdate {
    /// Cursor move.
    pub fn cursor(phase_key: impl Into<String>, question_index: usize, completed: bool) -> Self {
        Self {
            current_phase: Some(phase_key.into()),
            current_question_index: Some(question_index),
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Rename.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A session as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub id: SessionId,
    pub owner_id: UserId,
    pub title: String,
    pub template_type: String,
    pub current_phase: String,
    pub current_question_index: usize,
    pub completed: bool,
    pub turns: Vec<Turn>,
    pub notes: Vec<Note>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub template_type: String,
    pub current_phase: String,
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&StoredSession> for SessionSummary {
    fn from(session: &StoredSession) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            template_type: session.template_type.clone(),
            current_phase: session.current_phase.clone(),
            completed: session.completed,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
