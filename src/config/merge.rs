//! Merge policy configuration.

use serde::Deserialize;

use crate::domain::merge::MergePolicy;
use crate::domain::session::ConflictSeverity;

use super::error::ValidationError;

/// Merge policy parameters.
///
/// These are deliberate policy choices: the confidence formula's weights and
/// the confidence threshold above which overwriting a populated field raises
/// a conflict warning.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Weight of required-field coverage in the confidence formula.
    #[serde(default = "default_coverage_weight")]
    pub coverage_weight: f32,

    /// Weight of the turn's explicit signal in the confidence formula.
    #[serde(default = "default_signal_weight")]
    pub signal_weight: f32,

    /// Session confidence at or above which overwrites raise warnings.
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f32,

    /// Whether merger-detected overwrites block completeness (default:
    /// advisory only).
    #[serde(default)]
    pub blocking_overwrites: bool,
}

impl MergeConfig {
    /// Converts to the domain policy.
    pub fn to_policy(&self) -> MergePolicy {
        MergePolicy {
            coverage_weight: self.coverage_weight,
            signal_weight: self.signal_weight,
            conflict_threshold: self.conflict_threshold,
            overwrite_severity: if self.blocking_overwrites {
                ConflictSeverity::Blocking
            } else {
                ConflictSeverity::Advisory
            },
        }
    }

    /// Validates the policy parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_policy()
            .validate()
            .map_err(|e| ValidationError::InvalidValue {
                field: "merge",
                reason: e.to_string(),
            })
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            coverage_weight: default_coverage_weight(),
            signal_weight: default_signal_weight(),
            conflict_threshold: default_conflict_threshold(),
            blocking_overwrites: false,
        }
    }
}

fn default_coverage_weight() -> f32 {
    0.7
}

fn default_signal_weight() -> f32 {
    0.3
}

fn default_conflict_threshold() -> f32 {
    0.5
}
