//! The closed union of tool requests a dialogue turn may carry.
//!
//! Provider output is parsed into this union at the adapter boundary, so the
//! rest of the core never handles untyped payloads.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{FieldAssignment, FieldName};
use crate::domain::session::ConflictSeverity;

/// Wire name of the field-recording tool.
pub const RECORD_FIELD: &str = "record_field";
/// Wire name of the conflict-flagging tool.
pub const FLAG_CONFLICT: &str = "flag_conflict";
/// Wire name of the relationship-suggestion tool.
pub const SUGGEST_RELATIONSHIP: &str = "suggest_relationship";

/// A structured action request emitted by the dialogue service within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRequest {
    /// Record one extracted field value.
    RecordField {
        /// The typed field/value pair.
        assignment: FieldAssignment,
        /// Model-asserted confidence in this value, in [0, 1].
        confidence: Option<f32>,
    },
    /// Flag a conflict or uncertainty the model noticed.
    FlagConflict {
        /// The field the conflict concerns.
        field: FieldName,
        /// Human-readable description of the conflict.
        note: String,
        /// Whether the conflict should block completeness.
        severity: ConflictSeverity,
    },
    /// Suggest a relationship to another archive entity.
    SuggestRelationship {
        /// Name or id of the related entity.
        target: String,
        /// Nature of the relationship (e.g. "ward of").
        relation: String,
        /// Optional elaboration.
        note: Option<String>,
    },
}

impl ToolRequest {
    /// Returns the wire name of the requested tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolRequest::RecordField { .. } => RECORD_FIELD,
            ToolRequest::FlagConflict { .. } => FLAG_CONFLICT,
            ToolRequest::SuggestRelationship { .. } => SUGGEST_RELATIONSHIP,
        }
    }

    /// Parses a provider tool-use block (name + JSON input) into a request.
    ///
    /// # Errors
    ///
    /// Returns the serde error text when the name is unknown or the input
    /// does not match the tool's schema.
    pub fn from_tool_use(name: &str, input: serde_json::Value) -> Result<Self, String> {
        let mut object = match input {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(format!(
                    "tool input must be an object, got {}",
                    value_kind(&other)
                ))
            }
        };
        object.insert("tool".to_string(), serde_json::Value::String(name.to_string()));
        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| e.to_string())
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A relationship to another archive entity, suggested during a turn.
///
/// Suggestions surface in the turn result; they are not session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSuggestion {
    /// Name or id of the related entity.
    pub target: String,
    /// Nature of the relationship.
    pub relation: String,
    /// Optional elaboration.
    pub note: Option<String>,
}
