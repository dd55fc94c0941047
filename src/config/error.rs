//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Database path must not be empty")]
    EmptyDatabasePath,

    #[error("Pool size must be between 1 and {max}")]
    InvalidPoolSize { max: u32 },

    #[error("Timeout must be greater than zero: {0}")]
    InvalidTimeout(&'static str),

    #[error("Invalid AI provider settings: {0}")]
    InvalidAiProvider(String),

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
