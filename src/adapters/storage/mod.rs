//! Storage Adapters
//!
//! Implementations of the SessionStore port.
//!
//! ## Available Adapters
//!
//! - **SqliteSessionStore** - Single-file SQLite database (see `adapters::sqlite`)
//! - **InMemorySessionStore** - Stores sessions in memory (testing/development)

mod in_memory_session_store;

pub use in_memory_session_store::InMemorySessionStore;
