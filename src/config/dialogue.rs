//! Dialogue service configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::dialogue::AnthropicDialogueConfig;

use super::error::ValidationError;

/// Dialogue service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueConfig {
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failures.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl DialogueConfig {
    /// Get timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.anthropic_api_key
            .as_ref()
            .is_some_and(|k| !k.is_empty())
    }

    /// Builds the adapter configuration.
    ///
    /// # Errors
    ///
    /// - `MissingRequired` when no API key is configured
    pub fn adapter_config(&self) -> Result<AnthropicDialogueConfig, ValidationError> {
        let api_key = self
            .anthropic_api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingRequired("ANTHROPIC_API_KEY"))?;

        Ok(AnthropicDialogueConfig::new(api_key.clone())
            .with_model(self.model.clone())
            .with_base_url(self.base_url.clone())
            .with_timeout(self.timeout())
            .with_max_retries(self.max_retries))
    }

    /// Validate the dialogue configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("ANTHROPIC_API_KEY"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "dialogue.timeout_secs",
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}
