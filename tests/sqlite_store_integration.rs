//! Integration tests for the SQLite session store on a real database file.
//!
//! These tests verify:
//! 1. Sessions, turns and notes survive closing and reopening the file
//! 2. Migrations are applied once and re-running them is a no-op
//! 3. The engine resumes a saved consultation from disk

use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use inclusive_design_wizard::adapters::{MockAIProvider, SqliteSessionStore};
use inclusive_design_wizard::adapters::sqlite::{run_migrations, MIGRATIONS};
use inclusive_design_wizard::application::{AiGateway, ConsultationEngine, GatewaySettings};
use inclusive_design_wizard::config::DatabaseConfig;
use inclusive_design_wizard::domain::ai::{AIProviderConfig, ProviderSelection};
use inclusive_design_wizard::domain::consultation::{Note, Turn, TurnRole};
use inclusive_design_wizard::domain::foundation::UserId;
use inclusive_design_wizard::domain::phase::{inclusive_design_script, Reasoning};
use inclusive_design_wizard::ports::{NewSession, SessionStore, SessionUpdate};

fn database_in(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("nested").join("sessions.db"),
        max_connections: 2,
    }
}

fn new_session(title: &str) -> NewSession {
    NewSession {
        owner_id: UserId::local(),
        title: title.to_string(),
        template_type: "udl_review".to_string(),
        current_phase: "context".to_string(),
        current_question_index: 0,
        completed: false,
    }
}

fn engine(store: SqliteSessionStore) -> ConsultationEngine {
    let factory = MockAIProvider::new().factory();
    let config = AIProviderConfig::resolve(ProviderSelection::new("ollama")).unwrap();
    let gateway = AiGateway::new(config, Arc::new(factory), GatewaySettings::default());
    ConsultationEngine::new(Arc::new(store), inclusive_design_script(), Arc::new(gateway))
}

#[tokio::test]
async fn session_log_survives_reopening_the_file() {
    let dir = TempDir::new().unwrap();
    let config = database_in(&dir);

    let id = {
        let store = SqliteSessionStore::connect(&config).await.unwrap();
        let created = store.create(new_session("Physics unit")).await.unwrap();
        store
            .append_turn(&created.id, &Turn::user("Year 11, 28 students"))
            .await
            .unwrap();
        store
            .append_turn(
                &created.id,
                &Turn::new(TurnRole::Assistant, "Thanks!", Reasoning::Unknown),
            )
            .await
            .unwrap();
        store
            .append_note(&created.id, &Note::new("Ask about lab access"))
            .await
            .unwrap();
        store
            .update(&created.id, SessionUpdate::cursor("learner_analysis", 2, false))
            .await
            .unwrap();
        created.id
    };

    let reopened = SqliteSessionStore::connect(&config).await.unwrap();
    let stored = reopened.get_by_id(&id).await.unwrap().unwrap();

    assert_eq!(stored.title, "Physics unit");
    assert_eq!(stored.current_phase, "learner_analysis");
    assert_eq!(stored.current_question_index, 2);
    let contents: Vec<_> = stored.turns.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["Year 11, 28 students", "Thanks!"]);
    assert_eq!(stored.notes[0].content, "Ask about lab access");
}

#[tokio::test]
async fn migrations_apply_once() {
    let dir = TempDir::new().unwrap();
    let config = database_in(&dir);
    SqliteSessionStore::connect(&config).await.unwrap();

    let options = SqliteConnectOptions::new().filename(&config.path);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    assert_eq!(run_migrations(&pool).await.unwrap(), 0);

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applied as usize, MIGRATIONS.len());
}

#[tokio::test]
async fn engine_resumes_saved_consultation_from_disk() {
    let dir = TempDir::new().unwrap();
    let config = database_in(&dir);

    let id = {
        let mut engine = engine(SqliteSessionStore::connect(&config).await.unwrap());
        engine
            .start_ephemeral_session(UserId::local(), "Art history", "student_support")
            .await
            .unwrap();
        engine.greet().await.unwrap();
        engine
            .run_exchange("A first-year survey course", |_| {})
            .await
            .unwrap();
        engine.add_note("Follow up on captions").await.unwrap();
        engine
            .promote_ephemeral_to_durable()
            .await
            .unwrap()
            .id()
            .unwrap()
    };

    let mut engine = engine(SqliteSessionStore::connect(&config).await.unwrap());
    let session = engine.load_session(&id).await.unwrap();

    let roles: Vec<_> = session.turns().iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]
    );
    assert_eq!(session.notes().len(), 1);
    assert_eq!(session.template_type(), "student_support");
    assert_eq!(engine.progress().unwrap().completed_questions, 1);
    assert_eq!(engine.gateway().history().await.len(), 3);

    let listed = engine.list_sessions(&UserId::local()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
}
