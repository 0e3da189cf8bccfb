//! Entity archive port.
//!
//! The external persistence collaborator that materializes a finished
//! entity from validated session fields. Duplicate-commit protection is the
//! session status transition's job, not this port's.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::{EntityFields, MaterializedEntity};
use crate::domain::foundation::{EntityId, SessionId, UserId};

/// Port for materializing committed entities.
#[async_trait]
pub trait EntityArchive: Send + Sync {
    /// Persists a finished entity and returns the materialized record.
    ///
    /// `request.fields` has already passed the required-field check.
    async fn materialize(&self, request: CommitRequest) -> Result<MaterializedEntity, ArchiveError>;
}

/// A validated commit handed to the archive.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The session being committed.
    pub session_id: SessionId,
    /// Owner of the session, if any.
    pub user_id: Option<UserId>,
    /// Existing entity to update, when the session catalogs a known entity;
    /// `None` means the archive assigns a fresh id.
    pub entity_id: Option<EntityId>,
    /// The complete extracted fields.
    pub fields: EntityFields,
}

/// Errors from the entity archive.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// Backing storage failed.
    #[error("archive storage error: {0}")]
    Storage(String),

    /// The archive rejected the record.
    #[error("archive rejected the entity: {0}")]
    Rejected(String),
}

impl ArchiveError {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}
