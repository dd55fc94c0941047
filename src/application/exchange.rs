//! Exchange protocol: send message → stream reply → record reply.
//!
//! The user turn is recorded (and the cursor advanced) before the backend is
//! called. The reply streams on a spawned worker that reports
//! [`ExchangeEvent`]s over a channel in emission order; the engine records
//! the assistant turn once, from the `Done` event, and never for a failed
//! stream.
//!
//! Only one exchange runs per engine. Switching sessions drops the
//! receiving end, which detaches the worker: whatever it produces afterwards
//! is discarded.
//!
//! # Example
//!
//! ```ignore
//! engine.send_message("Year 9 chemistry, mixed ability").await?;
//! while let Some(event) = engine.next_event().await? {
//!     match event {
//!         ExchangeEvent::Fragment(text) => print!("{}", text),
//!         ExchangeEvent::Done { .. } => println!(),
//!         ExchangeEvent::Failed(failure) => println!("{}", failure),
//!     }
//! }
//! ```

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ai_gateway::AiGateway;
use super::consultation_engine::ConsultationEngine;
use crate::domain::ai::{Fragment, PhaseContext, StreamFailure, StreamFailureKind};
use crate::domain::consultation::TurnRole;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::phase::Reasoning;
use crate::ports::Message;

/// Events between the send and the reply worker.
const EVENT_BUFFER: usize = 64;

/// What the reply worker reports, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// A piece of the reply, ready to render.
    Fragment(String),
    /// The reply finished; `reply` is every fragment concatenated.
    Done { reply: String },
    /// The reply failed; nothing is recorded.
    Failed(StreamFailure),
}

impl ExchangeEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExchangeEvent::Fragment(_))
    }
}

/// Final result of a whole exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed { reply: String },
    Failed(StreamFailure),
}

/// A reply being produced by a worker.
pub(crate) struct InFlightExchange {
    events: mpsc::Receiver<ExchangeEvent>,
    /// Attached to the assistant turn when the reply completes.
    reasoning: Reasoning,
    worker: JoinHandle<()>,
}

impl ConsultationEngine {
    /// Records the user's message, advances the cursor and starts streaming
    /// the reply.
    ///
    /// # Errors
    ///
    /// - `EmptyField` for blank text (nothing is recorded)
    /// - `ExchangeInProgress` while a previous reply is still streaming
    /// - `NoActiveSession` / `DatabaseError` from recording or advancing
    pub async fn send_message(&mut self, text: &str) -> Result<(), DomainError> {
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("message").into());
        }
        self.ensure_idle()?;
        self.require_session()?;

        self.record_turn(TurnRole::User, text, Reasoning::Unknown)
            .await?;
        if !self.is_complete() {
            self.advance_question().await?;
        }

        self.start_reply().await
    }

    /// Streams a new reply for the pending user turn without recording
    /// anything new. Used after a failed reply.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the last turn is not a user turn
    /// - `ExchangeInProgress` while a reply is still streaming
    pub async fn retry_reply(&mut self) -> Result<(), DomainError> {
        self.ensure_idle()?;
        let pending = self
            .require_session()?
            .turns()
            .last()
            .is_some_and(|turn| turn.role == TurnRole::User);
        if !pending {
            return Err(DomainError::validation(
                "turns",
                "There is no unanswered message to retry",
            ));
        }
        self.start_reply().await
    }

    pub fn is_exchange_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Waits for the next event of the running exchange.
    ///
    /// Returns `Ok(None)` when no exchange is running. A `Done` event is
    /// returned only after the assistant turn has been recorded.
    ///
    /// # Errors
    ///
    /// `DatabaseError` if recording the completed reply fails; the exchange
    /// is over either way.
    pub async fn next_event(&mut self) -> Result<Option<ExchangeEvent>, DomainError> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return Ok(None);
        };

        match in_flight.events.recv().await {
            Some(ExchangeEvent::Fragment(text)) => Ok(Some(ExchangeEvent::Fragment(text))),
            Some(ExchangeEvent::Done { reply }) => {
                let reasoning = self.finish_exchange();
                self.record_turn(TurnRole::Assistant, reply.clone(), reasoning)
                    .await?;
                Ok(Some(ExchangeEvent::Done { reply }))
            }
            Some(ExchangeEvent::Failed(failure)) => {
                self.finish_exchange();
                warn!(kind = ?failure.kind, message = %failure.message, "Reply failed; no turn recorded");
                Ok(Some(ExchangeEvent::Failed(failure)))
            }
            None => {
                self.finish_exchange();
                warn!("Reply worker stopped without a result");
                Ok(Some(ExchangeEvent::Failed(StreamFailure::new(
                    StreamFailureKind::Provider,
                    "reply worker stopped unexpectedly",
                ))))
            }
        }
    }

    /// Sends a message and drives the reply to its end, handing each
    /// fragment to `on_fragment` as it arrives.
    pub async fn run_exchange<F>(
        &mut self,
        text: &str,
        mut on_fragment: F,
    ) -> Result<ExchangeOutcome, DomainError>
    where
        F: FnMut(&str),
    {
        self.send_message(text).await?;

        while let Some(event) = self.next_event().await? {
            match event {
                ExchangeEvent::Fragment(fragment) => on_fragment(&fragment),
                ExchangeEvent::Done { reply } => return Ok(ExchangeOutcome::Completed { reply }),
                ExchangeEvent::Failed(failure) => return Ok(ExchangeOutcome::Failed(failure)),
            }
        }

        Err(DomainError::new(
            ErrorCode::InternalError,
            "Exchange ended without a result",
        ))
    }

    fn ensure_idle(&self) -> Result<(), DomainError> {
        if self.is_exchange_in_flight() {
            return Err(DomainError::new(
                ErrorCode::ExchangeInProgress,
                "Please wait for the current reply to finish",
            ));
        }
        Ok(())
    }

    async fn start_reply(&mut self) -> Result<(), DomainError> {
        let system_prompt = self.system_prompt()?;
        let context = self.phase_context()?;
        let reasoning = self.current_reasoning()?;
        let history = self.gateway().history().await;

        let (sender, events) = mpsc::channel(EVENT_BUFFER);
        let worker = tokio::spawn(stream_reply(
            Arc::clone(self.gateway()),
            history,
            system_prompt,
            context,
            sender,
        ));

        self.in_flight = Some(InFlightExchange {
            events,
            reasoning,
            worker,
        });
        Ok(())
    }

    /// Clears the running exchange, returning the reasoning it was started
    /// with.
    fn finish_exchange(&mut self) -> Reasoning {
        match self.in_flight.take() {
            Some(in_flight) => {
                if !in_flight.worker.is_finished() {
                    debug!("Reply worker still winding down");
                }
                in_flight.reasoning
            }
            None => Reasoning::Unknown,
        }
    }
}

/// Worker body: forwards fragments, then exactly one terminal event.
async fn stream_reply(
    gateway: Arc<AiGateway>,
    history: Vec<Message>,
    system_prompt: String,
    context: PhaseContext,
    sender: mpsc::Sender<ExchangeEvent>,
) {
    let mut fragments = gateway
        .stream_completion(history, &system_prompt, Some(&context))
        .await;
    let mut reply = String::new();

    while let Some(fragment) = fragments.next().await {
        let event = match fragment {
            Fragment::Text(text) => {
                reply.push_str(&text);
                ExchangeEvent::Fragment(text)
            }
            Fragment::Failed(failure) => ExchangeEvent::Failed(failure),
        };
        let terminal = event.is_terminal();
        if sender.send(event).await.is_err() {
            debug!("Exchange detached; dropping the rest of the reply");
            return;
        }
        if terminal {
            return;
        }
    }

    if sender.send(ExchangeEvent::Done { reply }).await.is_err() {
        debug!("Exchange detached before completion");
    }
}
