//! Conflict and uncertainty warnings accumulated across turns.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::FieldName;
use crate::domain::foundation::Timestamp;

/// Severity of a conflict warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    /// Worth surfacing; does not block completeness.
    Advisory,
    /// Blocks the completeness judgment while unresolved.
    Blocking,
}

/// A human-readable conflict/uncertainty notice.
///
/// Warnings are append-only: they are never removed from a session. A fresh
/// merge on a warning's field marks it superseded instead, which keeps the
/// history visible while excluding it from completeness gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictWarning {
    field: Option<FieldName>,
    note: String,
    severity: ConflictSeverity,
    raised_at: Timestamp,
    superseded: bool,
}

impl ConflictWarning {
    /// Creates a warning tied to a specific field.
    pub fn for_field(
        field: FieldName,
        note: impl Into<String>,
        severity: ConflictSeverity,
    ) -> Self {
        Self {
            field: Some(field),
            note: note.into(),
            severity,
            raised_at: Timestamp::now(),
            superseded: false,
        }
    }

    /// Creates a general warning not tied to one field.
    pub fn general(note: impl Into<String>, severity: ConflictSeverity) -> Self {
        Self {
            field: None,
            note: note.into(),
            severity,
            raised_at: Timestamp::now(),
            superseded: false,
        }
    }

    /// Returns the affected field, if the warning is field-scoped.
    pub fn field(&self) -> Option<FieldName> {
        self.field
    }

    /// Returns the human-readable note.
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Returns the severity.
    pub fn severity(&self) -> ConflictSeverity {
        self.severity
    }

    /// Returns when the warning was raised.
    pub fn raised_at(&self) -> Timestamp {
        self.raised_at
    }

    /// Returns true once a later merge refreshed the warning's field.
    pub fn is_superseded(&self) -> bool {
        self.superseded
    }

    /// Marks the warning superseded. The note is retained.
    pub fn mark_superseded(&mut self) {
        self.superseded = true;
    }

    /// Returns true if this warning currently blocks completeness for a
    /// required field.
    pub fn blocks_completion(&self) -> bool {
        !self.superseded
            && self.severity == ConflictSeverity::Blocking
            && self.field.map(|f| f.is_required()).unwrap_or(false)
    }
}
