//! SQLite adapters - single-file persistence for consultation sessions.
//!
//! - `SqliteSessionStore` - SessionStore over a SQLite pool
//! - `run_migrations` - Versioned schema upgrades

mod migrations;
mod session_store;

pub use migrations::{run_migrations, Migration, MIGRATIONS};
pub use session_store::SqliteSessionStore;
