//! Application layer - orchestration over domain types and ports.
//!
//! - [`AiGateway`] owns the active backend configuration, the conversation
//!   history mirror and the time-budgeted fragment stream
//! - [`ConsultationEngine`] owns the active session's cursor and log and
//!   routes every mutation to memory or the session store
//! - the exchange protocol (send → stream → record) lives on the engine

mod ai_gateway;
mod consultation_engine;
mod exchange;

pub use ai_gateway::{AiGateway, FragmentStream, GatewaySettings};
pub use consultation_engine::{ConsultationEngine, CurrentPhase, COMPLETION_TITLE};
pub use exchange::{ExchangeEvent, ExchangeOutcome};
