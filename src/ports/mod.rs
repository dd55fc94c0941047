//! Ports - Interfaces for external dependencies.
//!
//! The application layer talks to language-model backends, session storage
//! and document formats only through these traits.

mod ai_provider;
mod document_exporter;
mod session_store;

pub use ai_provider::{
    AIError, AIProvider, ChatRequest, Message, MessageRole, ProviderFactory, ProviderInfo,
    TextStream,
};
pub use document_exporter::DocumentExporter;
pub use session_store::{NewSession, SessionStore, SessionSummary, SessionUpdate, StoredSession};
