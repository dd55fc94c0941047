//! In-Memory Session Store Adapter
//!
//! Keeps sessions in a map behind an async lock.
//! Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::consultation::{Note, Turn};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, UserId};
use crate::ports::{NewSession, SessionStore, SessionSummary, SessionUpdate, StoredSession};

/// In-memory storage for consultation sessions
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, StoredSession>>>,
}

fn not_found(id: &SessionId) -> DomainError {
    DomainError::new(ErrorCode::SessionNotFound, format!("Session not found: {}", id))
}

impl InMemorySessionStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    /// Get the number of stored sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn modify<F>(&self, id: &SessionId, apply: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut StoredSession) + Send,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        apply(session);
        session.updated_at = Timestamp::now();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, new_session: NewSession) -> Result<StoredSession, DomainError> {
        let now = Timestamp::now();
        let session = StoredSession {
            id: SessionId::new(),
            owner_id: new_session.owner_id,
            title: new_session.title,
            template_type: new_session.template_type,
            current_phase: new_session.current_phase,
            current_question_index: new_session.current_question_index,
            completed: new_session.completed,
            turns: Vec::new(),
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_by_id(&self, id: &SessionId) -> Result<Option<StoredSession>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, id: &SessionId, update: SessionUpdate) -> Result<(), DomainError> {
        self.modify(id, move |session| {
            if let Some(title) = update.title {
                session.title = title;
            }
            if let Some(phase) = update.current_phase {
                session.current_phase = phase;
            }
            if let Some(index) = update.current_question_index {
                session.current_question_index = index;
            }
            if let Some(completed) = update.completed {
                session.completed = completed;
            }
        })
        .await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> Result<(), DomainError> {
        let turn = turn.clone();
        self.modify(id, move |session| session.turns.push(turn)).await
    }

    async fn append_note(&self, id: &SessionId, note: &Note) -> Result<(), DomainError> {
        let note = note.clone();
        self.modify(id, move |session| session.notes.push(note)).await
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<SessionSummary>, DomainError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .filter(|s| &s.owner_id == owner_id)
            .map(SessionSummary::from)
            .collect();

        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase::Reasoning;

    fn new_session(owner: &str, title: &str) -> NewSession {
        NewSession {
            owner_id: UserId::new(owner).unwrap(),
            title: title.to_string(),
            template_type: "udl_review".to_string(),
            current_phase: "course_overview".to_string(),
            current_question_index: 0,
            completed: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let created = store.create(new_session("local", "Biology 101")).await.unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn get_unknown_returns_none() {
        let store = InMemorySessionStore::new();
        assert!(store.get_by_id(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_only_given_fields() {
        let store = InMemorySessionStore::new();
        let created = store.create(new_session("local", "Course")).await.unwrap();

        store
            .update(&created.id, SessionUpdate::cursor("wcag_review", 2, false))
            .await
            .unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Course");
        assert_eq!(loaded.current_phase, "wcag_review");
        assert_eq!(loaded.current_question_index, 2);
        assert!(!loaded.updated_at.is_before(&created.updated_at));
    }

    #[tokio::test]
    async fn update_unknown_session_fails() {
        let store = InMemorySessionStore::new();
        let err = store
            .update(&SessionId::new(), SessionUpdate::title("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn appends_keep_order() {
        let store = InMemorySessionStore::new();
        let created = store.create(new_session("local", "Course")).await.unwrap();

        store.append_turn(&created.id, &Turn::user("first")).await.unwrap();
        store
            .append_turn(&created.id, &Turn::assistant("second", Reasoning::Unknown))
            .await
            .unwrap();
        store.append_note(&created.id, &Note::new("remember captions")).await.unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        let contents: Vec<_> = loaded.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(loaded.notes[0].content, "remember captions");
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = InMemorySessionStore::new();
        let created = store.create(new_session("local", "Course")).await.unwrap();

        store.delete(&created.id).await.unwrap();
        assert!(store.get_by_id(&created.id).await.unwrap().is_none());

        let err = store.delete(&created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn list_filters_by_owner_most_recent_first() {
        let store = InMemorySessionStore::new();
        let older = store.create(new_session("local", "Older")).await.unwrap();
        let newer = store.create(new_session("local", "Newer")).await.unwrap();
        store.create(new_session("someone-else", "Hidden")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.append_note(&older.id, &Note::new("touched")).await.unwrap();

        let listed = store.list_by_owner(&UserId::local()).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Older", "Newer"]);
        assert_eq!(listed[1].id, newer.id);
    }
}
