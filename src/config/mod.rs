//! Typed configuration, loaded from the environment.
//!
//! Values come in through `ARCHIVIST`-prefixed environment variables (with
//! `__` separating nested sections), optionally via a `.env` file during
//! development. Every section carries defaults and a semantic `validate()`
//! pass.
//!
//! ```no_run
//! use archivist::config::ArchivistConfig;
//!
//! let config = ArchivistConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod dialogue;
mod error;
mod merge;

pub use dialogue::DialogueConfig;
pub use error::{ConfigError, ValidationError};
pub use merge::MergeConfig;

use serde::Deserialize;

/// Root configuration for the Archivist core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchivistConfig {
    /// Merge policy parameters (confidence weights, conflict threshold).
    #[serde(default)]
    pub merge: MergeConfig,

    /// Dialogue service configuration (provider key, model, timeouts).
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

impl ArchivistConfig {
    /// Reads configuration from the environment (and `.env`, if present).
    ///
    /// Variable naming: `ARCHIVIST__MERGE__COVERAGE_WEIGHT=0.8`,
    /// `ARCHIVIST__DIALOGUE__ANTHROPIC_API_KEY=sk-ant-...`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value cannot be parsed into the
    /// expected type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ARCHIVIST")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.merge.validate()?;
        self.dialogue.validate()?;
        Ok(())
    }
}
