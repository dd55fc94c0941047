//! SQLite implementation of SessionStore.
//!
//! Persists sessions, their turns and notes to a single database file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use super::migrations::run_migrations;
use crate::config::DatabaseConfig;
use crate::domain::consultation::{Note, Turn, TurnRole};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, UserId};
use crate::domain::phase::Reasoning;
use crate::ports::{NewSession, SessionStore, SessionSummary, SessionUpdate, StoredSession};

/// SQLite implementation of SessionStore.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

fn not_found(id: &SessionId) -> DomainError {
    DomainError::new(ErrorCode::SessionNotFound, format!("Session not found: {}", id))
}

impl SqliteSessionStore {
    /// Creates a store over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file and brings its schema up
    /// to date.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the file
    /// cannot be opened, or a migration fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DomainError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open database"))?;

        run_migrations(&pool).await?;
        tracing::info!(path = %config.path.display(), "Session database ready");

        Ok(Self::new(pool))
    }

    /// Private in-memory database, for tests.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error("Invalid in-memory options"))?
            .foreign_keys(true);

        // One connection: every new connection to :memory: is a new database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open in-memory database"))?;

        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn touch(
        tx: &mut Transaction<'_, Sqlite>,
        id: &SessionId,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(db_error("Failed to update session"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn load_turns(&self, id: &SessionId) -> Result<Vec<Turn>, DomainError> {
        sqlx::query(
            "SELECT role, content, reasoning, created_at FROM turns WHERE session_id = ? ORDER BY seq",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch turns"))?
        .iter()
        .map(row_to_turn)
        .collect()
    }

    async fn load_notes(&self, id: &SessionId) -> Result<Vec<Note>, DomainError> {
        sqlx::query("SELECT content, created_at FROM notes WHERE session_id = ? ORDER BY seq")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch notes"))?
            .iter()
            .map(row_to_note)
            .collect()
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, new_session: NewSession) -> Result<StoredSession, DomainError> {
        let id = SessionId::new();
        let now = Timestamp::now();

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, owner_id, title, template_type, current_phase,
                current_question_index, completed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(new_session.owner_id.as_str())
        .bind(&new_session.title)
        .bind(&new_session.template_type)
        .bind(&new_session.current_phase)
        .bind(new_session.current_question_index as i64)
        .bind(new_session.completed)
        .bind(now.as_datetime())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert session"))?;

        Ok(StoredSession {
            id,
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
        })
    }

    async fn get_by_id(&self, id: &SessionId) -> Result<Option<StoredSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, template_type, current_phase,
                   current_question_index, completed, created_at, updated_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch session"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut session = row_to_session(&row)?;
        session.turns = self.load_turns(id).await?;
        session.notes = self.load_notes(id).await?;
        Ok(Some(session))
    }

    async fn update(&self, id: &SessionId, update: SessionUpdate) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                title = COALESCE(?, title),
                current_phase = COALESCE(?, current_phase),
                current_question_index = COALESCE(?, current_question_index),
                completed = COALESCE(?, completed),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.title)
        .bind(update.current_phase)
        .bind(update.current_question_index.map(|i| i as i64))
        .bind(update.completed)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update session"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        for statement in [
            "DELETE FROM turns WHERE session_id = ?",
            "DELETE FROM notes WHERE session_id = ?",
        ] {
            sqlx::query(statement)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to delete session log"))?;
        }

        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete session"))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit delete"))?;
        Ok(())
    }

    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> Result<(), DomainError> {
        let reasoning = serde_json::to_string(&turn.reasoning).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to serialize reasoning: {}", e),
            )
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        Self::touch(&mut tx, id).await?;

        sqlx::query(
            r#"
            INSERT INTO turns (session_id, seq, role, content, reasoning, created_at)
            VALUES (?, (SELECT COALESCE(MAX(seq), -1) + 1 FROM turns WHERE session_id = ?), ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(id.to_string())
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(reasoning)
        .bind(turn.timestamp.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to append turn"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit turn"))?;
        Ok(())
    }

    async fn append_note(&self, id: &SessionId, note: &Note) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        Self::touch(&mut tx, id).await?;

        sqlx::query(
            r#"
            INSERT INTO notes (session_id, seq, content, created_at)
            VALUES (?, (SELECT COALESCE(MAX(seq), -1) + 1 FROM notes WHERE session_id = ?), ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(id.to_string())
        .bind(&note.content)
        .bind(note.timestamp.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to append note"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit note"))?;
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<SessionSummary>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, template_type, current_phase,
                   current_question_index, completed, created_at, updated_at
            FROM sessions
            WHERE owner_id = ?
            ORDER BY updated_at DESC, created_at DESC
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch sessions by owner"))?;

        rows.iter()
            .map(|row| row_to_session(row).map(|s| SessionSummary::from(&s)))
            .collect()
    }
}

fn decode_error(e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to decode row: {}", e))
}

/// Converts a session row; turns and notes are loaded separately.
fn row_to_session(row: &SqliteRow) -> Result<StoredSession, DomainError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let id = Uuid::parse_str(&id)
        .map(SessionId::from_uuid)
        .map_err(|e| DomainError::database(format!("Invalid session id '{}': {}", id, e)))?;

    let owner_id: String = row.try_get("owner_id").map_err(decode_error)?;
    let owner_id = UserId::new(owner_id).map_err(|e| DomainError::database(e.to_string()))?;

    let question_index: i64 = row
        .try_get("current_question_index")
        .map_err(decode_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode_error)?;

    Ok(StoredSession {
        id,
        owner_id,
        title: row.try_get("title").map_err(decode_error)?,
        template_type: row.try_get("template_type").map_err(decode_error)?,
        current_phase: row.try_get("current_phase").map_err(decode_error)?,
        current_question_index: usize::try_from(question_index).map_err(|_| {
            DomainError::database(format!("Negative question index {}", question_index))
        })?,
        completed: row.try_get("completed").map_err(decode_error)?,
        turns: Vec::new(),
        notes: Vec::new(),
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
    })
}

fn row_to_turn(row: &SqliteRow) -> Result<Turn, DomainError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    let role = TurnRole::from_str(&role).map_err(|e| DomainError::database(e.to_string()))?;

    // Rows written by older builds may carry unreadable reasoning; the turn
    // itself is still worth keeping.
    let reasoning: String = row.try_get("reasoning").map_err(decode_error)?;
    let reasoning: Reasoning = serde_json::from_str(&reasoning).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unreadable turn reasoning, treating as unknown");
        Reasoning::Unknown
    });

    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;

    Ok(Turn {
        role,
        content: row.try_get("content").map_err(decode_error)?,
        reasoning,
        timestamp: Timestamp::from_datetime(created_at),
    })
}

fn row_to_note(row: &SqliteRow) -> Result<Note, DomainError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode_error)?;
    Ok(Note {
        content: row.try_get("content").map_err(decode_error)?,
        timestamp: Timestamp::from_datetime(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase::test_support;

    fn new_session(title: &str) -> NewSession {
        NewSession {
            owner_id: UserId::local(),
            title: title.to_string(),
            template_type: "wcag_audit".to_string(),
            current_phase: "course_overview".to_string(),
            current_question_index: 0,
            completed: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let created = store.create(new_session("Chemistry")).await.unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.title, "Chemistry");
        assert_eq!(loaded.template_type, "wcag_audit");
        assert_eq!(loaded.current_phase, "course_overview");
        assert!(!loaded.completed);
        assert!(loaded.turns.is_empty());
    }

    #[tokio::test]
    async fn turns_keep_order_and_reasoning() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let created = store.create(new_session("Chemistry")).await.unwrap();

        let rationale = test_support::rationale("UDL");
        store.append_turn(&created.id, &Turn::user("hello")).await.unwrap();
        store
            .append_turn(
                &created.id,
                &Turn::assistant("hi", Reasoning::annotated("course_overview", rationale.clone())),
            )
            .await
            .unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.turns.len(), 2);
        assert_eq!(loaded.turns[0].role, TurnRole::User);
        assert_eq!(loaded.turns[1].content, "hi");
        assert_eq!(loaded.turns[1].reasoning.rationale(), Some(&rationale));
    }

    #[tokio::test]
    async fn update_unknown_session_is_not_found() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let err = store
            .update(&SessionId::new(), SessionUpdate::title("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn append_to_unknown_session_is_not_found() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let err = store
            .append_note(&SessionId::new(), &Note::new("orphan"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let created = store.create(new_session("Original")).await.unwrap();

        store
            .update(&created.id, SessionUpdate::cursor("complete", 0, true))
            .await
            .unwrap();

        let loaded = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Original");
        assert_eq!(loaded.current_phase, "complete");
        assert!(loaded.completed);
    }

    #[tokio::test]
    async fn delete_removes_log_too() {
        let store = SqliteSessionStore::in_memory().await.unwrap();
        let created = store.create(new_session("Doomed")).await.unwrap();
        store.append_turn(&created.id, &Turn::user("hello")).await.unwrap();
        store.append_note(&created.id, &Note::new("note")).await.unwrap();

        store.delete(&created.id).await.unwrap();

        assert!(store.get_by_id(&created.id).await.unwrap().is_none());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM turns")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
