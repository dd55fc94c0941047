//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `INCLUSIVE_DESIGN` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use inclusive_design_wizard::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Sessions stored in {}", config.database.path.display());
//! ```

mod ai;
mod database;
mod error;
mod logging;
mod preferences;

pub use ai::AiConfig;
pub use database::{DatabaseConfig, MAX_POOL_SIZE};
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use preferences::{ColorBlindMode, CursorStyle, DisplayPreferences, FontScale};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a working
/// local setup (Ollama, `data/inclusive_design.db`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Session database (SQLite file)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// AI backend selection and time budgets
    #[serde(default)]
    pub ai: AiConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Display accessibility preferences
    #[serde(default)]
    pub preferences: DisplayPreferences,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `INCLUSIVE_DESIGN` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `INCLUSIVE_DESIGN__AI__PROVIDER=anthropic` -> `ai.provider = "anthropic"`
    /// - `INCLUSIVE_DESIGN__DATABASE__PATH=...` -> `database.path = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("INCLUSIVE_DESIGN")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.ai.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
