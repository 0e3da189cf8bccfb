//! Grounding inputs passed through from external services.
//!
//! These summaries bias the interview; the core reads only the named field
//! blocks (`suggested`, `known`) and carries everything else opaquely.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::EntityId;

use super::EntityFields;

/// Vision-service summary of uploaded media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaAnalysis {
    /// One-line caption of the media, if the service produced one.
    pub caption: Option<String>,
    /// Field values the vision service suggests; used to seed a new session.
    #[serde(default)]
    pub suggested: EntityFields,
    /// Remaining analysis payload, passed through unmodified.
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl MediaAnalysis {
    /// Creates an analysis carrying only suggested fields.
    pub fn with_suggested(suggested: EntityFields) -> Self {
        Self {
            caption: None,
            suggested,
            detail: serde_json::Value::Null,
        }
    }

    /// Sets the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Prior-entity grounding for a session that catalogs a specific entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContext {
    /// The entity being catalogued.
    pub entity_id: EntityId,
    /// Display name, if known.
    pub name: Option<String>,
    /// Fields already on record for the entity.
    #[serde(default)]
    pub known: EntityFields,
    /// Free-form curator notes.
    pub notes: Option<String>,
}

impl EntityContext {
    /// Creates a context for an entity with nothing else known.
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            name: None,
            known: EntityFields::new(),
            notes: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the known fields.
    pub fn with_known(mut self, known: EntityFields) -> Self {
        self.known = known;
        self
    }

    /// Sets curator notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
