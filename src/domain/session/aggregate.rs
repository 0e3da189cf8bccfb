//! Session aggregate entity.
//!
//! A session is one cataloging conversation: its transcript, the cumulative
//! extracted fields, the confidence scalar, and accumulated warnings.
//!
//! # Invariants
//!
//! - `messages` is append-only; no message is ever removed or edited
//! - extracted field values are only replaced by a later merge that supplies
//!   a new value for the same field, never cleared implicitly
//! - terminal sessions (`Completed`, `Abandoned`) accept no further turns
//! - all mutation flows through the session manager

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::{EntityFields, FieldName};
use crate::domain::foundation::{EntityId, SessionId, Timestamp, UserId};
use crate::domain::merge::InterviewState;

use super::{ChatMessage, ConflictWarning, MessageRole, SessionStatus};

/// Raised when an operation requires an `Active` session.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("session {id} is {status}, not active")]
pub struct SessionStateError {
    /// The session the operation targeted.
    pub id: SessionId,
    /// Its current (terminal) status.
    pub status: SessionStatus,
}

/// Session aggregate - one cataloging conversation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, assigned at creation.
    id: SessionId,

    /// Owner; optional for anonymous flows.
    user_id: Option<UserId>,

    /// Entity this session catalogs; the resumption key when present.
    entity_id: Option<EntityId>,

    /// Lifecycle status.
    status: SessionStatus,

    /// Append-only transcript.
    messages: Vec<ChatMessage>,

    /// Cumulative partial field record.
    extracted_fields: EntityFields,

    /// Overall confidence in [0, 1], recomputed after every merge.
    confidence: f32,

    /// Append-only conflict/uncertainty notices.
    warnings: Vec<ConflictWarning>,

    /// When the session was created.
    started_at: Timestamp,

    /// Updated on every turn; basis for caller-side staleness policy.
    last_activity_at: Timestamp,
}

impl Session {
    /// Creates a new active session with an empty transcript.
    pub fn new(user_id: Option<UserId>, entity_id: Option<EntityId>) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            user_id,
            entity_id,
            status: SessionStatus::Active,
            messages: Vec::new(),
            extracted_fields: EntityFields::new(),
            confidence: 0.0,
            warnings: Vec::new(),
            started_at: now,
            last_activity_at: now,
        }
    }

    /// Reconstitutes a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        user_id: Option<UserId>,
        entity_id: Option<EntityId>,
        status: SessionStatus,
        messages: Vec<ChatMessage>,
        extracted_fields: EntityFields,
        confidence: f32,
        warnings: Vec<ConflictWarning>,
        started_at: Timestamp,
        last_activity_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            entity_id,
            status,
            messages,
            extracted_fields,
            confidence,
            warnings,
            started_at,
            last_activity_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the owner's user ID, if the session is owned.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Returns the entity being catalogued, if any.
    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity_id
    }

    /// Returns the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the transcript.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of user messages in the transcript.
    pub fn user_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    /// Returns the cumulative extracted fields.
    pub fn extracted_fields(&self) -> &EntityFields {
        &self.extracted_fields
    }

    /// Returns the overall confidence.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the accumulated warnings.
    pub fn warnings(&self) -> &[ConflictWarning] {
        &self.warnings
    }

    /// Returns when the session was created.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns when the session last saw activity.
    pub fn last_activity_at(&self) -> Timestamp {
        self.last_activity_at
    }

    /// Checks if the given user owns this session.
    ///
    /// Authorization policy is the caller's responsibility; this only
    /// exposes the comparison.
    pub fn is_owner(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    /// Returns the derived interview state. Never stored; a function of the
    /// extracted fields and warnings alone.
    pub fn interview_state(&self) -> InterviewState {
        InterviewState::derive(&self.extracted_fields, &self.warnings)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates that the session accepts further turns.
    ///
    /// # Errors
    ///
    /// - `SessionStateError` if the session is terminal
    pub fn ensure_active(&self) -> Result<(), SessionStateError> {
        if self.status.is_terminal() {
            Err(SessionStateError {
                id: self.id,
                status: self.status,
            })
        } else {
            Ok(())
        }
    }

    /// Appends a message to the transcript.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.touch();
    }

    /// Applies a merge result: replaces the field record, updates the
    /// confidence, marks pre-existing warnings on refreshed fields
    /// superseded, and appends the new warnings.
    pub fn apply_merge(
        &mut self,
        fields: EntityFields,
        confidence: f32,
        refreshed: &[FieldName],
        new_warnings: Vec<ConflictWarning>,
    ) {
        for warning in &mut self.warnings {
            if let Some(field) = warning.field() {
                if refreshed.contains(&field) {
                    warning.mark_superseded();
                }
            }
        }
        self.warnings.extend(new_warnings);
        self.extracted_fields = fields;
        self.confidence = confidence;
        self.touch();
    }

    /// Transitions to `Completed` after a successful commit.
    ///
    /// # Errors
    ///
    /// - `SessionStateError` if the session is already terminal
    pub fn complete(&mut self) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        self.status = SessionStatus::Completed;
        self.touch();
        Ok(())
    }

    /// Transitions to `Abandoned`. No completeness check.
    ///
    /// # Errors
    ///
    /// - `SessionStateError` if the session is already terminal
    pub fn abandon(&mut self) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        self.status = SessionStatus::Abandoned;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.last_activity_at = Timestamp::now();
    }
}
