//! Validation errors for value object construction.

use thiserror::Error;

/// Raised when a value object rejects its input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field} must lie within [{min}, {max}], got {actual}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        actual: f64,
    },

    #[error("{field} is malformed: {reason}")]
    Malformed { field: String, reason: String },
}

impl ValidationError {
    /// An empty or blank value.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::Empty {
            field: field.into(),
        }
    }

    /// A numeric value outside its allowed interval.
    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, actual: f64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// A value whose shape is wrong.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Malformed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
