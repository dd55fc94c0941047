//! Versioned schema for the session database.
//!
//! Each migration runs once, inside its own transaction, and is recorded in
//! `schema_migrations`. Running the list again is a no-op.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::foundation::DomainError;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations, oldest first. Never edit an entry once released.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_sessions",
        statements: &[r#"
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY NOT NULL,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                template_type TEXT NOT NULL,
                current_phase TEXT NOT NULL,
                current_question_index INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#],
    },
    Migration {
        version: 2,
        name: "create_turns",
        statements: &[r#"
            CREATE TABLE turns (
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                reasoning TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )
            "#],
    },
    Migration {
        version: 3,
        name: "create_notes",
        statements: &[r#"
            CREATE TABLE notes (
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )
            "#],
    },
    Migration {
        version: 4,
        name: "index_sessions_by_owner",
        statements: &[
            "CREATE INDEX idx_sessions_owner_updated ON sessions (owner_id, updated_at DESC)",
        ],
    },
];

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

/// Applies every migration not yet recorded. Returns how many ran.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, DomainError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_error("Failed to create schema_migrations"))?;

    let applied: Vec<i64> = sqlx::query("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to read schema_migrations"))?
        .iter()
        .map(|row| row.try_get::<i64, _>("version"))
        .collect::<Result<_, _>>()
        .map_err(db_error("Failed to decode schema version"))?;

    let mut ran = 0;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        let mut tx = pool
            .begin()
            .await
            .map_err(db_error("Failed to begin migration"))?;

        for statement in migration.statements {
            sqlx::query(*statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::database(format!(
                        "Migration {} ({}) failed: {}",
                        migration.version, migration.name, e
                    ))
                })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to record migration"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit migration"))?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied schema migration"
        );
        ran += 1;
    }

    Ok(ran)
}
