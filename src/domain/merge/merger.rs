//! Reconciles newly extracted fields with accumulated session state.
//!
//! Merge semantics: per-field last-write-wins. Fields absent from a turn's
//! patch are left untouched; a value once set is only ever replaced by a
//! later merge supplying a new value for the same field.
//!
//! Confidence is recomputed after every merge from the merged record and the
//! turn's own signal alone, so it is reproducible from session state:
//!
//! ```text
//! coverage   = populated required fields / required field count
//! confidence = coverage_weight * coverage + signal_weight * signal   (signal present)
//!            = coverage                                              (no signal)
//! ```

use crate::domain::catalog::{EntityFields, FieldName};
use crate::domain::foundation::ValidationError;
use crate::domain::session::{ConflictSeverity, ConflictWarning};
use crate::domain::tools::TurnEffects;

/// Policy parameters for merging and scoring.
///
/// All values are deliberate policy choices, not hidden constants; they are
/// overridable through configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePolicy {
    /// Weight of required-field coverage in the confidence formula.
    pub coverage_weight: f32,
    /// Weight of the turn's explicit signal in the confidence formula.
    pub signal_weight: f32,
    /// Session confidence at or above which overwriting a populated field
    /// raises a conflict warning.
    pub conflict_threshold: f32,
    /// Severity of merger-detected overwrite warnings. Tool-flagged
    /// conflicts carry their own severity.
    pub overwrite_severity: ConflictSeverity,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            coverage_weight: 0.7,
            signal_weight: 0.3,
            conflict_threshold: 0.5,
            overwrite_severity: ConflictSeverity::Advisory,
        }
    }
}

impl MergePolicy {
    /// Validates the policy parameters.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if a weight or threshold leaves [0, 1]
    /// - `InvalidFormat` if the weights do not sum to 1.0
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("coverage_weight", self.coverage_weight),
            ("signal_weight", self.signal_weight),
            ("conflict_threshold", self.conflict_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::out_of_range(
                    name,
                    0.0,
                    1.0,
                    f64::from(value),
                ));
            }
        }
        if (self.coverage_weight + self.signal_weight - 1.0).abs() > 1e-6 {
            return Err(ValidationError::invalid_format(
                "weights",
                "coverage_weight and signal_weight must sum to 1.0",
            ));
        }
        Ok(())
    }
}

/// Result of merging one turn's proposals into the accumulated record.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged full record.
    pub fields: EntityFields,
    /// Only the values applied this merge.
    pub delta: EntityFields,
    /// Fields that received a value this merge, in first-touch order.
    pub refreshed: Vec<FieldName>,
    /// Warnings raised this merge (tool-flagged plus overwrite-detected).
    pub new_warnings: Vec<ConflictWarning>,
    /// Recomputed overall confidence.
    pub confidence: f32,
    /// Completeness judgment after this merge.
    pub is_complete: bool,
}

/// Derived interview state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    /// Required fields missing or a blocking conflict is unresolved.
    Gathering,
    /// All required fields present and no blocking warning; commit may
    /// proceed at the caller's initiative.
    ReadyToCommit,
}

impl InterviewState {
    /// Derives the state from the accumulated record and warnings.
    pub fn derive(fields: &EntityFields, warnings: &[ConflictWarning]) -> Self {
        let blocked = warnings.iter().any(|w| w.blocks_completion());
        if fields.missing_required().is_empty() && !blocked {
            InterviewState::ReadyToCommit
        } else {
            InterviewState::Gathering
        }
    }
}

/// Merges turn effects into accumulated fields and rescores confidence.
#[derive(Debug, Clone, Default)]
pub struct FieldMerger {
    policy: MergePolicy,
}

impl FieldMerger {
    /// Creates a merger with the given policy.
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Merges a turn's effects into the current record.
    ///
    /// `existing_warnings` and `prior_confidence` come from the session as
    /// it was before this merge; `turn_signal` is the turn's explicit
    /// completeness signal, if any.
    pub fn merge(
        &self,
        current: &EntityFields,
        existing_warnings: &[ConflictWarning],
        prior_confidence: f32,
        effects: &TurnEffects,
        turn_signal: Option<f32>,
    ) -> MergeOutcome {
        let mut fields = current.clone();
        let mut delta = EntityFields::new();
        let mut refreshed: Vec<FieldName> = Vec::new();
        let mut new_warnings = effects.conflicts.clone();

        for (assignment, _) in &effects.patch {
            let displaced = fields.apply(assignment);
            delta.apply(assignment);
            let field = assignment.field();
            if !refreshed.contains(&field) {
                refreshed.push(field);
            }
            if let Some(prior) = displaced {
                if prior_confidence >= self.policy.conflict_threshold {
                    new_warnings.push(ConflictWarning::for_field(
                        field,
                        format!(
                            "{} changed from \"{}\" to \"{}\"",
                            field.wire_name(),
                            prior,
                            assignment.display_value()
                        ),
                        self.policy.overwrite_severity,
                    ));
                }
            }
        }

        let confidence = self.score(&fields, turn_signal);
        let is_complete =
            self.judge_complete(&fields, existing_warnings, &refreshed, &new_warnings);

        MergeOutcome {
            fields,
            delta,
            refreshed,
            new_warnings,
            confidence,
            is_complete,
        }
    }

    /// Computes the confidence score for a record and an optional signal.
    pub fn score(&self, fields: &EntityFields, turn_signal: Option<f32>) -> f32 {
        let coverage = fields.required_coverage();
        let raw = match turn_signal {
            Some(signal) => {
                self.policy.coverage_weight * coverage + self.policy.signal_weight * signal
            }
            None => coverage,
        };
        raw.clamp(0.0, 1.0)
    }

    /// Completeness: every required field populated and no live blocking
    /// warning on a required field. Warnings on fields refreshed this merge
    /// count as resolved; warnings raised this merge count as live.
    fn judge_complete(
        &self,
        fields: &EntityFields,
        existing_warnings: &[ConflictWarning],
        refreshed: &[FieldName],
        new_warnings: &[ConflictWarning],
    ) -> bool {
        if !fields.missing_required().is_empty() {
            return false;
        }
        let existing_blocks = existing_warnings.iter().any(|w| {
            w.blocks_completion()
                && w.field()
                    .map(|f| !refreshed.contains(&f))
                    .unwrap_or(true)
        });
        let new_blocks = new_warnings.iter().any(|w| w.blocks_completion());
        !existing_blocks && !new_blocks
    }
}
