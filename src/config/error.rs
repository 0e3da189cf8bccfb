//! Configuration error types.

use thiserror::Error;

/// Errors loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `config` crate failed to read or deserialize values.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors from semantic validation of loaded configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// A required value is missing.
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// A value is present but invalid.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Which configuration field.
        field: &'static str,
        /// Why it is invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_displays_key() {
        let err = ValidationError::MissingRequired("ANTHROPIC_API_KEY");
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn invalid_value_displays_field_and_reason() {
        let err = ValidationError::InvalidValue {
            field: "merge.coverage_weight",
            reason: "weights must sum to 1.0".to_string(),
        };
        assert!(err.to_string().contains("merge.coverage_weight"));
        assert!(err.to_string().contains("sum to 1.0"));
    }
}
