//! Database configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Upper bound for the SQLite pool; writers serialize anyway.
pub const MAX_POOL_SIZE: u32 = 16;

/// Database configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite database file, created on first start
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Maximum connections allowed
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyDatabasePath);
        }
        if self.max_connections == 0 || self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::InvalidPoolSize { max: MAX_POOL_SIZE });
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("data/inclusive_design.db")
}

fn default_max_connections() -> u32 {
    4
}
