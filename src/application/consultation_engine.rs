//! Consultation Engine - cursor, conversation log and persistence routing
//! for the active session.
//!
//! A session is either `Unsaved` (held only in memory until promoted) or
//! `Saved` (every mutation goes to the [`SessionStore`] first). Durable
//! mutations are persist-then-apply: if the store rejects a write, the
//! in-memory session is left exactly as it was.
//!
//! Every turn recorded here is mirrored into the [`AiGateway`] history so the
//! next completion sees the same conversation the user sees.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ai_gateway::AiGateway;
use super::exchange::InFlightExchange;
use crate::domain::ai::{ConsultationType, PhaseContext};
use crate::domain::consultation::{
    ConsultationSession, Cursor, ExportDocument, Note, Progress, Turn, TurnRole, COMPLETE_MARKER,
};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, UserId, ValidationError};
use crate::domain::phase::{PhaseDefinition, PhaseScript, Rationale, Reasoning};
use crate::ports::{NewSession, SessionStore, SessionSummary, SessionUpdate, StoredSession};

/// Display name reported once every phase is done.
pub const COMPLETION_TITLE: &str = "Consultation Complete";

/// Phase at the cursor, or the synthetic completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentPhase<'a> {
    Active(&'a PhaseDefinition),
    Complete,
}

impl<'a> CurrentPhase<'a> {
    pub fn key(&self) -> &'a str {
        match self {
            CurrentPhase::Active(phase) => phase.key(),
            CurrentPhase::Complete => COMPLETE_MARKER,
        }
    }

    pub fn display_name(&self) -> &'a str {
        match self {
            CurrentPhase::Active(phase) => phase.display_name(),
            CurrentPhase::Complete => COMPLETION_TITLE,
        }
    }

    /// Questions of the phase; none for the completion marker.
    pub fn questions(&self) -> &'a [String] {
        match self {
            CurrentPhase::Active(phase) => phase.questions(),
            CurrentPhase::Complete => &[],
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CurrentPhase::Complete)
    }
}

/// The active session in one of its two durability states.
#[derive(Debug, Clone)]
enum ActiveSession {
    /// In memory only; owner and template already fixed.
    Unsaved(ConsultationSession),
    /// Backed by the store; the session is the last known snapshot.
    Saved {
        id: SessionId,
        session: ConsultationSession,
    },
}

impl ActiveSession {
    fn session(&self) -> &ConsultationSession {
        match self {
            ActiveSession::Unsaved(session) => session,
            ActiveSession::Saved { session, .. } => session,
        }
    }
}

/// Drives one consultation at a time.
pub struct ConsultationEngine {
    store: Arc<dyn SessionStore>,
    script: Arc<PhaseScript>,
    gateway: Arc<AiGateway>,
    active: Option<ActiveSession>,
    pub(super) in_flight: Option<InFlightExchange>,
}

impl ConsultationEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        script: Arc<PhaseScript>,
        gateway: Arc<AiGateway>,
    ) -> Self {
        Self {
            store,
            script,
            gateway,
            active: None,
            in_flight: None,
        }
    }

    pub fn script(&self) -> &PhaseScript {
        &self.script
    }

    pub fn gateway(&self) -> &Arc<AiGateway> {
        &self.gateway
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a session and persists it immediately.
    ///
    /// # Errors
    ///
    /// - `EmptyField` / `OutOfRange` for an invalid title
    /// - `DatabaseError` if the store rejects the row
    pub async fn start_durable_session(
        &mut self,
        owner_id: UserId,
        title: impl Into<String>,
        template_type: impl Into<String>,
    ) -> Result<&ConsultationSession, DomainError> {
        let draft = ConsultationSession::draft(owner_id, title, template_type)?;
        let stored = self.store.create(self.new_row(&draft)).await?;
        let id = stored.id;
        let session = hydrate(&self.script, stored)?;

        info!(session_id = %id, template = %session.template_type(), "Durable session started");
        self.replace_active(ActiveSession::Saved { id, session }).await;
        self.require_session()
    }

    /// Creates a session held only in memory until promoted.
    pub async fn start_ephemeral_session(
        &mut self,
        owner_id: UserId,
        title: impl Into<String>,
        template_type: impl Into<String>,
    ) -> Result<&ConsultationSession, DomainError> {
        let draft = ConsultationSession::draft(owner_id, title, template_type)?;

        info!(template = %draft.template_type(), "Ephemeral session started");
        self.replace_active(ActiveSession::Unsaved(draft)).await;
        self.require_session()
    }

    /// Persists an unsaved session, replaying its turns and notes in order.
    ///
    /// Already durable sessions are returned unchanged. If any write fails
    /// the partially written row is removed (best effort) and the session
    /// stays unsaved.
    pub async fn promote_ephemeral_to_durable(
        &mut self,
    ) -> Result<&ConsultationSession, DomainError> {
        let draft = match self.active.as_ref() {
            None => return Err(no_active_session()),
            Some(ActiveSession::Saved { .. }) => return self.require_session(),
            Some(ActiveSession::Unsaved(draft)) => draft.clone(),
        };

        let stored = self.store.create(self.new_row(&draft)).await?;
        let id = stored.id;

        if let Err(err) = self.replay_into_store(&id, &draft).await {
            warn!(session_id = %id, error = %err, "Promotion failed; discarding partial row");
            if let Err(cleanup) = self.store.delete(&id).await {
                warn!(session_id = %id, error = %cleanup, "Could not remove partial row");
            }
            return Err(err);
        }

        let session = fetch(self.store.as_ref(), &self.script, &id).await?;
        info!(
            session_id = %id,
            turns = session.turns().len(),
            notes = session.notes().len(),
            "Ephemeral session promoted"
        );
        self.active = Some(ActiveSession::Saved { id, session });
        self.require_session()
    }

    /// Loads a stored session and makes it active.
    ///
    /// An unrecognised stored phase key does not fail the load: the cursor
    /// lands on the completion marker and a warning is logged.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if no session has this id
    /// - `OutOfRange` if the stored question index exceeds its phase
    /// - `DatabaseError` on store failure
    pub async fn load_session(&mut self, id: &SessionId) -> Result<&ConsultationSession, DomainError> {
        let session = fetch(self.store.as_ref(), &self.script, id).await?;

        info!(session_id = %id, turns = session.turns().len(), "Session loaded");
        self.replace_active(ActiveSession::Saved { id: *id, session })
            .await;
        self.require_session()
    }

    /// Drops the active session; a running exchange is detached.
    pub async fn close_session(&mut self) {
        self.detach_exchange();
        self.active = None;
        self.gateway.reset_conversation().await;
    }

    pub async fn list_sessions(&self, owner_id: &UserId) -> Result<Vec<SessionSummary>, DomainError> {
        self.store.list_by_owner(owner_id).await
    }

    /// Deletes a stored session, closing it first if it is the active one.
    pub async fn delete_session(&mut self, id: &SessionId) -> Result<(), DomainError> {
        self.store.delete(id).await?;
        if self.active_id() == Some(*id) {
            self.close_session().await;
        }
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&ConsultationSession> {
        self.active.as_ref().map(ActiveSession::session)
    }

    /// True once the active session is backed by the store.
    pub fn is_saved(&self) -> bool {
        matches!(self.active, Some(ActiveSession::Saved { .. }))
    }

    pub fn active_id(&self) -> Option<SessionId> {
        match &self.active {
            Some(ActiveSession::Saved { id, .. }) => Some(*id),
            _ => None,
        }
    }

    pub fn current_phase(&self) -> Result<CurrentPhase<'_>, DomainError> {
        let cursor = self.require_session()?.cursor();
        Ok(self.phase_at(cursor))
    }

    /// Question at the cursor; `None` when the current phase is exhausted
    /// or the consultation is complete.
    pub fn current_question(&self) -> Result<Option<&str>, DomainError> {
        let cursor = self.require_session()?.cursor();
        Ok(self
            .script
            .phase(cursor.phase_index())
            .and_then(|phase| phase.question(cursor.question_index())))
    }

    /// Rationale of the current phase, or the generic fallback once complete.
    pub fn current_rationale(&self) -> Result<&Rationale, DomainError> {
        let cursor = self.require_session()?.cursor();
        Ok(match self.phase_at(cursor) {
            CurrentPhase::Active(phase) => self
                .script
                .rationale_for(phase.key(), cursor.question_index()),
            CurrentPhase::Complete => self.script.fallback_rationale(),
        })
    }

    /// Reasoning attached to assistant turns produced at the cursor.
    pub fn current_reasoning(&self) -> Result<Reasoning, DomainError> {
        let cursor = self.require_session()?.cursor();
        Ok(match self.phase_at(cursor) {
            CurrentPhase::Active(phase) => Reasoning::annotated(
                phase.key(),
                self.script
                    .rationale_for(phase.key(), cursor.question_index())
                    .clone(),
            ),
            CurrentPhase::Complete => Reasoning::Unknown,
        })
    }

    /// Phase annotations framed into the system prompt.
    pub fn phase_context(&self) -> Result<PhaseContext, DomainError> {
        let phase = self.current_phase()?;
        let rationale = self.current_rationale()?;
        Ok(PhaseContext {
            phase_name: phase.display_name().to_string(),
            framework: rationale.framework.clone(),
            rationale: rationale.rationale.clone(),
            next_question: self.current_question()?.map(str::to_string),
        })
    }

    /// Base system prompt for the session's consultation type.
    pub fn system_prompt(&self) -> Result<String, DomainError> {
        let session = self.require_session()?;
        Ok(ConsultationType::from_template(session.template_type()).system_prompt())
    }

    pub fn progress(&self) -> Result<Progress, DomainError> {
        let cursor = self.require_session()?.cursor();
        Ok(Progress::compute(&self.script, &cursor))
    }

    /// `phase_cursor >= phase_count`; false without an active session.
    pub fn is_complete(&self) -> bool {
        self.session()
            .is_some_and(|s| s.cursor().is_complete(&self.script))
    }

    /// Plain records for a document exporter.
    pub fn export(&self) -> Result<ExportDocument, DomainError> {
        let session = self.require_session()?;
        let template = ConsultationType::from_template(session.template_type());
        Ok(ExportDocument::from_session(
            session,
            &self.script,
            template.display_name(),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves to the next question, rolling over into the next phase.
    ///
    /// Returns whether the phase changed. Durable sessions are reloaded,
    /// advanced and persisted before the in-memory cursor moves. Advancing a
    /// complete session is a no-op returning `false`.
    pub async fn advance_question(&mut self) -> Result<bool, DomainError> {
        let script = Arc::clone(&self.script);

        match self.active.as_mut() {
            None => Err(no_active_session()),
            Some(ActiveSession::Unsaved(session)) => {
                Ok(apply_advance(&script, session))
            }
            Some(ActiveSession::Saved { id, session }) => {
                let mut fresh = fetch(self.store.as_ref(), &script, id).await?;
                let cursor = fresh.cursor();
                if cursor.is_complete(&script) {
                    *session = fresh;
                    return Ok(false);
                }

                let step = cursor.advanced(&script);
                let completed = step.cursor.is_complete(&script);
                self.store
                    .update(
                        id,
                        SessionUpdate::cursor(
                            step.cursor.stored_key(&script),
                            step.cursor.question_index(),
                            completed,
                        ),
                    )
                    .await?;

                fresh.move_cursor(step.cursor, completed);
                log_advance(&script, step.cursor, step.phase_changed, completed);
                *session = fresh;
                Ok(step.phase_changed)
            }
        }
    }

    /// Appends a turn to the log and mirrors it into the gateway history.
    ///
    /// Durable sessions are reloaded after the append so the in-memory log
    /// matches the store, including turns written by someone else.
    pub async fn record_turn(
        &mut self,
        role: TurnRole,
        content: impl Into<String>,
        reasoning: Reasoning,
    ) -> Result<(), DomainError> {
        let turn = Turn::new(role, content, reasoning);
        let script = Arc::clone(&self.script);

        let resync = match self.active.as_mut() {
            None => return Err(no_active_session()),
            Some(ActiveSession::Unsaved(session)) => {
                session.push_turn(turn.clone());
                false
            }
            Some(ActiveSession::Saved { id, session }) => {
                self.store.append_turn(id, &turn).await?;
                let fresh = fetch(self.store.as_ref(), &script, id).await?;
                let expected = session.turns().len() + 1;
                let drifted = fresh.turns().len() != expected;
                if drifted {
                    warn!(
                        session_id = %id,
                        expected,
                        stored = fresh.turns().len(),
                        "Stored turn log changed outside this engine; resynchronizing"
                    );
                }
                *session = fresh;
                drifted
            }
        };

        debug!(role = %turn.role, chars = turn.content.len(), "Turn recorded");
        if resync {
            self.replay_history().await;
        } else {
            self.gateway.add_to_history(turn.role, turn.content).await;
        }
        Ok(())
    }

    /// Appends a free-form note, independent of the conversation.
    pub async fn add_note(&mut self, content: impl Into<String>) -> Result<(), DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::empty_field("note").into());
        }
        let note = Note::new(content);

        match self.active.as_mut() {
            None => Err(no_active_session()),
            Some(ActiveSession::Unsaved(session)) => {
                session.push_note(note);
                Ok(())
            }
            Some(ActiveSession::Saved { id, session }) => {
                self.store.append_note(id, &note).await?;
                session.push_note(note);
                Ok(())
            }
        }
    }

    /// Opens the conversation with a greeting that asks the first question.
    ///
    /// Only applies to an empty log; returns the greeting when one was
    /// recorded.
    pub async fn greet(&mut self) -> Result<Option<String>, DomainError> {
        if !self.require_session()?.turns().is_empty() {
            return Ok(None);
        }
        let Some(question) = self.current_question()? else {
            return Ok(None);
        };

        let greeting = format!(
            "Welcome! I'm your inclusive design consultant. Let's work together to create \
             an accessible learning experience.\n\nTo get started, {}",
            question
        );
        let reasoning = self.current_reasoning()?;
        self.record_turn(TurnRole::Assistant, greeting.clone(), reasoning)
            .await?;
        Ok(Some(greeting))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn require_session(&self) -> Result<&ConsultationSession, DomainError> {
        self.session().ok_or_else(no_active_session)
    }

    fn phase_at(&self, cursor: Cursor) -> CurrentPhase<'_> {
        match self.script.phase(cursor.phase_index()) {
            Some(phase) => CurrentPhase::Active(phase),
            None => CurrentPhase::Complete,
        }
    }

    fn new_row(&self, session: &ConsultationSession) -> NewSession {
        let cursor = session.cursor();
        NewSession {
            owner_id: session.owner_id().clone(),
            title: session.title().to_string(),
            template_type: session.template_type().to_string(),
            current_phase: cursor.stored_key(&self.script),
            current_question_index: cursor.question_index(),
            completed: session.is_completed(),
        }
    }

    async fn replay_into_store(
        &self,
        id: &SessionId,
        session: &ConsultationSession,
    ) -> Result<(), DomainError> {
        for turn in session.turns() {
            self.store.append_turn(id, turn).await?;
        }
        for note in session.notes() {
            self.store.append_note(id, note).await?;
        }
        Ok(())
    }

    /// Swaps in a different session: any running exchange is detached and
    /// the gateway history is rebuilt from the new log.
    async fn replace_active(&mut self, next: ActiveSession) {
        self.detach_exchange();
        self.active = Some(next);
        self.replay_history().await;
    }

    /// Rebuilds the gateway history mirror from the active session's log.
    async fn replay_history(&self) {
        self.gateway.reset_conversation().await;
        let Some(active) = self.active.as_ref() else {
            return;
        };
        for turn in active.session().turns() {
            self.gateway
                .add_to_history(turn.role, turn.content.clone())
                .await;
        }
    }

    fn detach_exchange(&mut self) {
        if self.in_flight.take().is_some() {
            debug!("Detached running exchange; its reply will be ignored");
        }
    }
}

fn no_active_session() -> DomainError {
    DomainError::new(ErrorCode::NoActiveSession, "No consultation session is active")
}

fn not_found(id: &SessionId) -> DomainError {
    DomainError::new(ErrorCode::SessionNotFound, "Session not found")
        .with_detail("session_id", id.to_string())
}

async fn fetch(
    store: &dyn SessionStore,
    script: &PhaseScript,
    id: &SessionId,
) -> Result<ConsultationSession, DomainError> {
    let stored = store.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    hydrate(script, stored)
}

/// Rebuilds a session from its stored row, restoring the cursor from the
/// stored phase key.
fn hydrate(script: &PhaseScript, stored: StoredSession) -> Result<ConsultationSession, DomainError> {
    let restored = Cursor::restore(script, &stored.current_phase, stored.current_question_index)?;
    if !restored.recognized {
        warn!(
            session_id = %stored.id,
            phase = %stored.current_phase,
            "Stored phase key is not part of the script; treating session as complete"
        );
    }
    let completed = restored.cursor.is_complete(script);
    if stored.completed != completed {
        warn!(
            session_id = %stored.id,
            stored_completed = stored.completed,
            cursor_completed = completed,
            "Stored completion flag disagrees with the cursor; using the cursor"
        );
    }

    Ok(ConsultationSession::reconstitute(
        stored.id,
        stored.owner_id,
        stored.title,
        stored.template_type,
        restored.cursor,
        stored.turns,
        stored.notes,
        completed,
        stored.created_at,
        stored.updated_at,
    ))
}

fn apply_advance(script: &PhaseScript, session: &mut ConsultationSession) -> bool {
    let cursor = session.cursor();
    if cursor.is_complete(script) {
        return false;
    }
    let step = cursor.advanced(script);
    let completed = step.cursor.is_complete(script);
    session.move_cursor(step.cursor, completed);
    log_advance(script, step.cursor, step.phase_changed, completed);
    step.phase_changed
}

fn log_advance(script: &PhaseScript, cursor: Cursor, phase_changed: bool, completed: bool) {
    if completed {
        info!("Consultation complete");
    } else if phase_changed {
        info!(phase = %cursor.stored_key(script), "Moved to next phase");
    }
}
