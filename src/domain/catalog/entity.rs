//! Materialized entity record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EntityId, SessionId, Timestamp};

use super::EntityFields;

/// A committed archive entity, materialized from a completed session.
///
/// # Invariants
///
/// - `fields` satisfies the schema's required set at creation time
/// - provenance (`session_id`) is immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedEntity {
    id: EntityId,
    fields: EntityFields,
    session_id: SessionId,
    committed_at: Timestamp,
}

impl MaterializedEntity {
    /// Creates a new materialized entity.
    pub fn new(id: EntityId, fields: EntityFields, session_id: SessionId) -> Self {
        Self {
            id,
            fields,
            session_id,
            committed_at: Timestamp::now(),
        }
    }

    /// Reconstitutes an entity from persistence (no validation).
    pub fn reconstitute(
        id: EntityId,
        fields: EntityFields,
        session_id: SessionId,
        committed_at: Timestamp,
    ) -> Self {
        Self {
            id,
            fields,
            session_id,
            committed_at,
        }
    }

    /// Returns the entity id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the committed fields.
    pub fn fields(&self) -> &EntityFields {
        &self.fields
    }

    /// Returns the session this entity was materialized from.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns when the entity was committed.
    pub fn committed_at(&self) -> Timestamp {
        self.committed_at
    }
}
