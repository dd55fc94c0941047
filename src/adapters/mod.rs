//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Streaming language-model backends (Ollama, OpenAI-compatible, Anthropic)
//! - `sqlite` - Durable session storage
//! - `storage` - In-memory session storage
//! - `document` - Consultation export formats

pub mod ai;
pub mod document;
pub mod sqlite;
pub mod storage;

pub use ai::{HttpProviderFactory, MockAIProvider};
pub use document::MarkdownExporter;
pub use sqlite::SqliteSessionStore;
pub use storage::InMemorySessionStore;
