//! Tool orchestration: executes a turn's tool requests against per-turn
//! state, isolating failures.
//!
//! A failing call never aborts the turn or the remaining calls; it is
//! recorded and surfaced. This isolation is the core's primary
//! partial-failure decision.

use tracing::debug;

use crate::domain::catalog::FieldAssignment;
use crate::domain::session::ConflictWarning;

use super::{RelationshipSuggestion, ToolInvocationRecord, ToolRequest};

/// Accumulated side effects of one turn's tool calls.
#[derive(Debug, Clone, Default)]
pub struct TurnEffects {
    /// Validated field assignments, in request order, with the asserted
    /// confidence of each (1.0 when the model gave none).
    pub patch: Vec<(FieldAssignment, f32)>,
    /// Conflicts the model flagged explicitly.
    pub conflicts: Vec<ConflictWarning>,
    /// Relationship suggestions raised this turn.
    pub relationships: Vec<RelationshipSuggestion>,
}

impl TurnEffects {
    /// Returns true if the turn proposed no state changes at all.
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty() && self.conflicts.is_empty() && self.relationships.is_empty()
    }

    /// Mean of the asserted confidences in the patch, if any values were
    /// recorded. Used as the turn's derived completeness signal when the
    /// dialogue service reports none.
    pub fn mean_assertion(&self) -> Option<f32> {
        if self.patch.is_empty() {
            return None;
        }
        let sum: f32 = self.patch.iter().map(|(_, c)| c).sum();
        Some(sum / self.patch.len() as f32)
    }
}

/// Executes tool requests in order, capturing one audit record per call.
#[derive(Debug, Clone, Default)]
pub struct ToolOrchestrator;

impl ToolOrchestrator {
    /// Creates a new orchestrator.
    pub fn new() -> Self {
        Self
    }

    /// Executes every request in order. Failures are recorded, not raised.
    pub fn execute_all(
        &self,
        requests: Vec<ToolRequest>,
    ) -> (TurnEffects, Vec<ToolInvocationRecord>) {
        let mut effects = TurnEffects::default();
        let mut records = Vec::with_capacity(requests.len());

        for request in requests {
            let in_flight = ToolInvocationRecord::started(request.name());
            let record = match self.execute(request, &mut effects) {
                Ok(()) => in_flight.succeeded(),
                Err(error) => {
                    debug!(error = %error, "tool call failed");
                    in_flight.failed(error)
                }
            };
            records.push(record);
        }

        (effects, records)
    }

    fn execute(&self, request: ToolRequest, effects: &mut TurnEffects) -> Result<(), String> {
        match request {
            ToolRequest::RecordField {
                assignment,
                confidence,
            } => {
                assignment.validate().map_err(|e| e.to_string())?;
                let confidence = confidence.unwrap_or(1.0);
                if !(0.0..=1.0).contains(&confidence) {
                    return Err(format!(
                        "confidence must be between 0 and 1, got {}",
                        confidence
                    ));
                }
                effects.patch.push((assignment, confidence));
                Ok(())
            }
            ToolRequest::FlagConflict {
                field,
                note,
                severity,
            } => {
                if note.trim().is_empty() {
                    return Err("conflict note cannot be empty".to_string());
                }
                effects
                    .conflicts
                    .push(ConflictWarning::for_field(field, note, severity));
                Ok(())
            }
            ToolRequest::SuggestRelationship {
                target,
                relation,
                note,
            } => {
                if target.trim().is_empty() || relation.trim().is_empty() {
                    return Err("relationship target and relation cannot be empty".to_string());
                }
                effects.relationships.push(RelationshipSuggestion {
                    target,
                    relation,
                    note,
                });
                Ok(())
            }
        }
    }
}
