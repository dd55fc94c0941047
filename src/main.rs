//! Inclusive Design Wizard - line-oriented consultation shell.
//!
//! Reads configuration from the environment, opens the SQLite session
//! store, probes the configured AI backend and then runs a consultation
//! over stdin. Lines starting with `/` are commands; anything else is sent
//! to the consultant.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use inclusive_design_wizard::adapters::{HttpProviderFactory, MarkdownExporter, SqliteSessionStore};
use inclusive_design_wizard::application::{
    AiGateway, ConsultationEngine, ExchangeEvent, ExchangeOutcome,
};
use inclusive_design_wizard::config::{self, AppConfig, LoggingConfig};
use inclusive_design_wizard::domain::ai::AIError;
use inclusive_design_wizard::domain::foundation::{DomainError, SessionId, UserId};
use inclusive_design_wizard::domain::phase::inclusive_design_script;
use inclusive_design_wizard::ports::DocumentExporter;

const HELP: &str = "Commands: /progress  /note <text>  /save  /sessions  /load <id>  \
                    /export <path>  /retry  /help  /quit";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ValidationError),

    #[error("AI backend error: {0}")]
    Ai(#[from] AIError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging)?;

    tracing::info!(
        font_scale = ?config.preferences.font_scale,
        high_contrast = config.preferences.high_contrast,
        color_blind_mode = config.preferences.color_blind_mode.label(),
        cursor = config.preferences.cursor.label(),
        "Display preferences loaded"
    );

    let store = SqliteSessionStore::connect(&config.database).await?;
    let factory = HttpProviderFactory::new()?;
    let gateway = AiGateway::from_config(&config.ai, Arc::new(factory))?;

    if let Ok(backend) = gateway.active_backend().await {
        println!("Using {} ({}) at {}", backend.name, backend.model, backend.endpoint);
    }
    let (reachable, message) = gateway.test_connection().await;
    if reachable {
        println!("AI backend: {}", message);
    } else {
        println!("AI backend unavailable: {}", message);
    }

    let mut engine = ConsultationEngine::new(
        Arc::new(store),
        inclusive_design_script(),
        Arc::new(gateway),
    );
    let template = std::env::args().nth(1).unwrap_or_default();
    engine
        .start_ephemeral_session(UserId::local(), "Quick Consultation", template)
        .await?;
    if let Some(greeting) = engine.greet().await? {
        println!("\n{}\n", greeting);
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Err(err) = handle_line(&mut engine, line).await {
            println!("{}", err);
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), config::ValidationError> {
    let registry = tracing_subscriber::registry().with(logging.env_filter()?);
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

async fn handle_line(engine: &mut ConsultationEngine, line: &str) -> Result<(), CliError> {
    let (command, argument) = match line.split_once(' ') {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "/help" => println!("{}", HELP),
        "/progress" => {
            let progress = engine.progress()?;
            println!(
                "{:.0}% ({}/{} questions) - {}",
                progress.percent,
                progress.completed_questions,
                progress.total_questions,
                engine.current_phase()?.display_name()
            );
        }
        "/note" => {
            engine.add_note(argument).await?;
            println!("Note added.");
        }
        "/save" => {
            let session = engine.promote_ephemeral_to_durable().await?;
            if let Some(id) = session.id() {
                println!("Saved as {}", id);
            }
        }
        "/sessions" => {
            for summary in engine.list_sessions(&UserId::local()).await? {
                let status = if summary.completed { "complete" } else { "in progress" };
                println!(
                    "{}  {}  [{}]  {}",
                    summary.id,
                    summary.updated_at.date_label(),
                    status,
                    summary.title
                );
            }
        }
        "/load" => {
            let id: SessionId = argument
                .parse()
                .map_err(|_| DomainError::validation("id", "Not a session id"))?;
            let session = engine.load_session(&id).await?;
            println!("Loaded '{}' ({} turns)", session.title(), session.turns().len());
        }
        "/export" => {
            let exporter = MarkdownExporter::new();
            let mut path = PathBuf::from(if argument.is_empty() { "consultation" } else { argument });
            if path.extension().is_none() {
                path.set_extension(exporter.file_extension());
            }
            let bytes = exporter.render(&engine.export()?)?;
            tokio::fs::write(&path, bytes).await?;
            println!("Exported to {}", path.display());
        }
        "/retry" => {
            engine.retry_reply().await?;
            drain_reply(engine).await?;
        }
        _ if command.starts_with('/') => println!("Unknown command. {}", HELP),
        _ => {
            let outcome = engine.run_exchange(line, print_fragment).await?;
            finish_reply(outcome);
        }
    }
    Ok(())
}

async fn drain_reply(engine: &mut ConsultationEngine) -> Result<(), CliError> {
    while let Some(event) = engine.next_event().await? {
        match event {
            ExchangeEvent::Fragment(text) => print_fragment(&text),
            ExchangeEvent::Done { reply } => finish_reply(ExchangeOutcome::Completed { reply }),
            ExchangeEvent::Failed(failure) => finish_reply(ExchangeOutcome::Failed(failure)),
        }
    }
    Ok(())
}

fn print_fragment(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

fn finish_reply(outcome: ExchangeOutcome) {
    match outcome {
        ExchangeOutcome::Completed { .. } => println!("\n"),
        ExchangeOutcome::Failed(failure) => println!("{}\n\nType /retry to try again.\n", failure),
    }
}
