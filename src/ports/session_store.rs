//! Session store port.
//!
//! Defines the contract for persisting and retrieving Session aggregates.
//! The store is the only shared mutable resource in the core; callers must
//! respect the per-session serialization contract enforced by the session
//! manager.
//!
//! # Design
//!
//! - Whole-aggregate reads and writes; no partial updates
//! - The `(user, entity)` uniqueness guarantee for active sessions is the
//!   implementation's responsibility

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{EntityId, SessionId, UserId};
use crate::domain::session::Session;

/// Port for session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session by id. Returns `None` if not found.
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Saves a session, inserting or replacing the whole aggregate.
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Finds the active (non-terminal) session for a `(user, entity)` pair.
    ///
    /// At most one such session exists; returns `None` when there is none.
    async fn find_active_by_user_and_entity(
        &self,
        user_id: &UserId,
        entity_id: &EntityId,
    ) -> Result<Option<Session>, StoreError>;
}

/// Errors from the session store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backing storage unavailable or failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Session payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}
