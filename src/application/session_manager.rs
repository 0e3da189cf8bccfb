//! Session lifecycle management.
//!
//! The session manager is the public entry point for every operation and the
//! only component that mutates persisted session state. Each operation loads
//! the session, computes on a working copy, and persists once; a dialogue
//! failure therefore leaves the stored session exactly as it was.
//!
//! # Serialization contract
//!
//! At most one `chat`/`commit_to_archive`/`abandon_session` call may be in
//! flight per session at any time: two concurrent turns racing on the same
//! session would silently lose one turn's updates. The manager enforces this
//! with a per-key async lock registry; `get_or_create_session_for_entity` is
//! serialized the same way on its `(user, entity)` key so concurrent callers
//! cannot double-create.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::domain::catalog::{
    EntityContext, EntityFields, FieldName, MaterializedEntity, MediaAnalysis,
};
use crate::domain::foundation::{EntityId, SessionId, UserId};
use crate::domain::merge::FieldMerger;
use crate::domain::session::{
    ChatMessage, ConflictWarning, Session, SessionStateError, SessionStatus,
};
use crate::domain::tools::{RelationshipSuggestion, ToolInvocationRecord, TurnEffects};
use crate::ports::{
    ArchiveError, CommitRequest, DialogueError, DialogueService, EntityArchive, SessionStore,
    StoreError,
};

use super::turn::{TurnOutcome, TurnProcessor};

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation referenced an unknown session id.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Operation attempted on a terminal session.
    #[error("session {id} is {status}, not active")]
    SessionNotActive {
        /// The session the operation targeted.
        id: SessionId,
        /// Its current status.
        status: SessionStatus,
    },

    /// Commit attempted before all required fields were populated. Carries
    /// the exact missing field list, derived from the schema alone.
    #[error("missing required fields: [{}]", .0.iter().map(|f| f.wire_name()).collect::<Vec<_>>().join(", "))]
    MissingRequiredFields(Vec<FieldName>),

    /// The dialogue service call failed; the session was left unmodified.
    #[error("dialogue service failure: {0}")]
    Dialogue(#[from] DialogueError),

    /// The session store failed.
    #[error("session store failure: {0}")]
    Store(#[from] StoreError),

    /// The entity archive failed.
    #[error("entity archive failure: {0}")]
    Archive(#[from] ArchiveError),
}

impl From<SessionStateError> for SessionError {
    fn from(err: SessionStateError) -> Self {
        SessionError::SessionNotActive {
            id: err.id,
            status: err.status,
        }
    }
}

/// Parameters for starting a session.
#[derive(Debug, Clone, Default)]
pub struct StartSessionRequest {
    /// Owner; optional for anonymous flows.
    pub user_id: Option<UserId>,
    /// Entity the session catalogs, when resuming work on a known entity.
    pub entity_id: Option<EntityId>,
    /// Vision-analysis summary to seed fields from.
    pub media_analysis: Option<MediaAnalysis>,
    /// Prior-entity grounding for the opening message.
    pub entity_context: Option<EntityContext>,
}

impl StartSessionRequest {
    /// Creates an empty request (anonymous, no grounding).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owner.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the entity id.
    pub fn with_entity(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    /// Sets the media analysis.
    pub fn with_media_analysis(mut self, analysis: MediaAnalysis) -> Self {
        self.media_analysis = Some(analysis);
        self
    }

    /// Sets the entity context.
    pub fn with_entity_context(mut self, context: EntityContext) -> Self {
        self.entity_context = Some(context);
        self
    }
}

/// Per-turn options for `chat`.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Image the user attached to this turn.
    pub image_url: Option<String>,
    /// Fresh grounding context for this turn.
    pub entity_context: Option<EntityContext>,
}

impl ChatOptions {
    /// Sets the attached image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Sets the grounding context.
    pub fn with_entity_context(mut self, context: EntityContext) -> Self {
        self.entity_context = Some(context);
        self
    }
}

/// What one `chat` call returns to the caller.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The assistant's reply.
    pub message: String,
    /// Only the field values extracted this turn.
    pub extracted: EntityFields,
    /// Overall confidence after the merge.
    pub confidence: f32,
    /// Follow-up questions the model proposes.
    pub suggested_questions: Vec<String>,
    /// Warnings raised this turn.
    pub warnings: Vec<ConflictWarning>,
    /// Completeness judgment after the merge.
    pub is_complete: bool,
    /// One audit record per attempted tool call.
    pub tools_used: Vec<ToolInvocationRecord>,
    /// Relationships suggested this turn.
    pub suggested_relationships: Vec<RelationshipSuggestion>,
}

/// Result of `get_or_create_session_for_entity`.
#[derive(Debug, Clone)]
pub struct EntitySession {
    /// The active session for the `(user, entity)` pair.
    pub session: Session,
    /// True when an existing session was resumed. A resumed session also
    /// carries its prior transcript (more than one message after the first
    /// exchange), which callers can use to replay the conversation.
    pub resumed: bool,
}

/// Registry of per-key async locks.
///
/// Entries are retained for the manager's lifetime; the set of concurrently
/// touched sessions per process is small.
#[derive(Default)]
struct LockRegistry {
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    fn get(&self, key: String) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks.entry(key).or_default().clone()
    }
}

/// Owns session lifecycle and is the sole mutator of persisted state.
pub struct SessionManager<S, D, A> {
    store: Arc<S>,
    turns: TurnProcessor<D>,
    archive: Arc<A>,
    merger: FieldMerger,
    locks: LockRegistry,
}

impl<S, D, A> SessionManager<S, D, A>
where
    S: SessionStore,
    D: DialogueService,
    A: EntityArchive,
{
    /// Creates a manager over the given collaborators.
    pub fn new(store: Arc<S>, dialogue: Arc<D>, archive: Arc<A>, merger: FieldMerger) -> Self {
        Self {
            store,
            turns: TurnProcessor::new(dialogue),
            archive,
            merger,
            locks: LockRegistry::default(),
        }
    }

    /// Starts a new session: seeds fields from media analysis when present,
    /// requests the opening assistant message, persists, and returns the
    /// session. Nothing is persisted if the dialogue service fails.
    pub async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<Session, SessionError> {
        let mut session = Session::new(request.user_id, request.entity_id);

        if let Some(analysis) = &request.media_analysis {
            self.seed_from_media(&mut session, analysis);
        }

        let opening = self
            .turns
            .opening_turn(
                session.extracted_fields().clone(),
                request.entity_context,
                request.media_analysis,
            )
            .await?;
        self.fold_turn(&mut session, &opening);
        session.push_message(ChatMessage::assistant(opening.reply.clone()));

        self.store.save(&session).await?;
        info!(session_id = %session.id(), "session started");
        Ok(session)
    }

    /// Returns the active session for `(user, entity)`, creating one only if
    /// none exists. Resumption returns the session unchanged: no new opening
    /// message is generated, and `entity_context`/`media_analysis` are
    /// ignored for an existing session. Safe to call repeatedly.
    pub async fn get_or_create_session_for_entity(
        &self,
        user_id: UserId,
        entity_id: EntityId,
        entity_context: Option<EntityContext>,
        media_analysis: Option<MediaAnalysis>,
    ) -> Result<EntitySession, SessionError> {
        let key = format!("entity:{}:{}", user_id, entity_id);
        let lock = self.locks.get(key);
        let _guard = lock.lock().await;

        if let Some(session) = self
            .store
            .find_active_by_user_and_entity(&user_id, &entity_id)
            .await?
        {
            debug!(session_id = %session.id(), %entity_id, "resumed existing session");
            return Ok(EntitySession {
                session,
                resumed: true,
            });
        }

        let mut request = StartSessionRequest::new()
            .with_user(user_id)
            .with_entity(entity_id);
        request.entity_context = entity_context;
        request.media_analysis = media_analysis;

        let session = self.start_session(request).await?;
        Ok(EntitySession {
            session,
            resumed: false,
        })
    }

    /// Fetches a session by id.
    pub async fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.store
            .load(id)
            .await?
            .ok_or(SessionError::SessionNotFound(*id))
    }

    /// Processes one user turn: appends the user message, runs the dialogue
    /// turn, merges extracted fields, appends the assistant reply, persists
    /// once. All-or-nothing: a dialogue failure leaves the stored session
    /// untouched and the caller may retry the same message.
    pub async fn chat(
        &self,
        id: &SessionId,
        message: &str,
        options: ChatOptions,
    ) -> Result<TurnResult, SessionError> {
        let lock = self.locks.get(format!("session:{}", id));
        let _guard = lock.lock().await;

        let mut session = self.get_session(id).await?;
        session.ensure_active()?;

        let outcome = self
            .turns
            .process(&session, message, options.image_url, options.entity_context)
            .await?;

        session.push_message(ChatMessage::user(message));
        let merged = self.fold_turn(&mut session, &outcome);
        session.push_message(ChatMessage::assistant(outcome.reply.clone()));

        self.store.save(&session).await?;
        debug!(
            session_id = %id,
            confidence = session.confidence(),
            complete = merged.is_complete,
            "turn persisted"
        );

        Ok(TurnResult {
            message: outcome.reply,
            extracted: merged.delta,
            confidence: merged.confidence,
            suggested_questions: outcome.follow_up_questions,
            warnings: merged.new_warnings,
            is_complete: merged.is_complete,
            tools_used: outcome.tools_used,
            suggested_relationships: outcome.effects.relationships,
        })
    }

    /// Validates completeness and materializes the entity. On success the
    /// session transitions to `Completed`, which guards against re-commit.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` for unknown ids
    /// - `SessionNotActive` for terminal sessions
    /// - `MissingRequiredFields` with the exact schema-derived list
    pub async fn commit_to_archive(
        &self,
        id: &SessionId,
    ) -> Result<MaterializedEntity, SessionError> {
        let lock = self.locks.get(format!("session:{}", id));
        let _guard = lock.lock().await;

        let mut session = self.get_session(id).await?;
        session.ensure_active()?;

        let missing = session.extracted_fields().missing_required();
        if !missing.is_empty() {
            return Err(SessionError::MissingRequiredFields(missing));
        }

        let entity = self
            .archive
            .materialize(CommitRequest {
                session_id: session.id(),
                user_id: session.user_id().cloned(),
                entity_id: session.entity_id(),
                fields: session.extracted_fields().clone(),
            })
            .await?;

        session.complete()?;
        self.store.save(&session).await?;
        info!(session_id = %id, entity_id = %entity.id(), "session committed to archive");
        Ok(entity)
    }

    /// Abandons a session unconditionally (no completeness check).
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` for unknown ids
    /// - `SessionNotActive` for already-terminal sessions
    pub async fn abandon_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let lock = self.locks.get(format!("session:{}", id));
        let _guard = lock.lock().await;

        let mut session = self.get_session(id).await?;
        session.abandon()?;
        self.store.save(&session).await?;
        info!(session_id = %id, "session abandoned");
        Ok(())
    }

    /// Seeds extracted fields from a vision-analysis suggestion, scored
    /// through the merger so confidence starts at the seeded coverage.
    fn seed_from_media(&self, session: &mut Session, analysis: &MediaAnalysis) {
        let effects = TurnEffects {
            patch: analysis
                .suggested
                .to_assignments()
                .into_iter()
                .map(|a| (a, 1.0))
                .collect(),
            conflicts: Vec::new(),
            relationships: Vec::new(),
        };
        if effects.patch.is_empty() {
            return;
        }
        let outcome = self.merger.merge(
            session.extracted_fields(),
            session.warnings(),
            session.confidence(),
            &effects,
            None,
        );
        session.apply_merge(
            outcome.fields,
            outcome.confidence,
            &outcome.refreshed,
            outcome.new_warnings,
        );
    }

    /// Merges a turn's effects into the session and returns the outcome.
    fn fold_turn(
        &self,
        session: &mut Session,
        outcome: &TurnOutcome,
    ) -> crate::domain::merge::MergeOutcome {
        let merged = self.merger.merge(
            session.extracted_fields(),
            session.warnings(),
            session.confidence(),
            &outcome.effects,
            outcome.completeness_signal,
        );
        session.apply_merge(
            merged.fields.clone(),
            merged.confidence,
            &merged.refreshed,
            merged.new_warnings.clone(),
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dialogue::{ScriptedDialogue, ScriptedFailure};
    use crate::adapters::memory::{InMemoryEntityArchive, InMemorySessionStore};
    use crate::domain::catalog::FieldAssignment;
    use crate::domain::session::MessageRole;
    use crate::domain::tools::ToolRequest;
    use crate::ports::DialogueTurn;

    type TestManager = SessionManager<InMemorySessionStore, ScriptedDialogue, InMemoryEntityArchive>;

    fn manager(dialogue: ScriptedDialogue) -> TestManager {
        SessionManager::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(dialogue),
            Arc::new(InMemoryEntityArchive::new()),
            FieldMerger::default(),
        )
    }

    fn user() -> UserId {
        UserId::new("keeper-1").unwrap()
    }

    fn record(assignment: FieldAssignment, confidence: f32) -> ToolRequest {
        ToolRequest::RecordField {
            assignment,
            confidence: Some(confidence),
        }
    }

    mod start_session {
        use super::*;

        #[tokio::test]
        async fn fresh_session_has_greeting_and_empty_fields() {
            let dialogue =
                ScriptedDialogue::new().with_turn(DialogueTurn::reply("What did you encounter?"));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();

            assert_eq!(session.status(), SessionStatus::Active);
            assert_eq!(session.messages().len(), 1);
            assert_eq!(session.messages()[0].role, MessageRole::Assistant);
            assert!(session.extracted_fields().is_empty());
            assert_eq!(session.confidence(), 0.0);
        }

        #[tokio::test]
        async fn media_analysis_seeds_fields_and_confidence() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("I see a guardian in the image."));
            let manager = manager(dialogue);

            let suggested = EntityFields {
                entity_type: Some("Guardian".to_string()),
                domain: Some("Dream Threshold".to_string()),
                ..Default::default()
            };
            let session = manager
                .start_session(
                    StartSessionRequest::new()
                        .with_media_analysis(MediaAnalysis::with_suggested(suggested)),
                )
                .await
                .unwrap();

            assert_eq!(
                session.extracted_fields().entity_type.as_deref(),
                Some("Guardian")
            );
            assert!((session.confidence() - 2.0 / 3.0).abs() < 1e-6);
        }

        #[tokio::test]
        async fn dialogue_failure_persists_nothing() {
            let store = Arc::new(InMemorySessionStore::new());
            let dialogue = ScriptedDialogue::new()
                .with_failure(ScriptedFailure::Unavailable {
                    message: "down".to_string(),
                });
            let manager = SessionManager::new(
                Arc::clone(&store),
                Arc::new(dialogue),
                Arc::new(InMemoryEntityArchive::new()),
                FieldMerger::default(),
            );

            let result = manager.start_session(StartSessionRequest::new()).await;
            assert!(matches!(result, Err(SessionError::Dialogue(_))));
            assert_eq!(store.len(), 0);
        }
    }

    mod get_or_create {
        use super::*;

        #[tokio::test]
        async fn creates_then_resumes_with_same_id() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Opening."))
                .with_turn(DialogueTurn::reply("Should not be used."));
            let manager = manager(dialogue);
            let entity = EntityId::new();

            let first = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            assert!(!first.resumed);

            let second = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            assert!(second.resumed);
            assert_eq!(first.session.id(), second.session.id());
            // The opening message was not duplicated.
            assert_eq!(second.session.messages().len(), 1);
        }

        #[tokio::test]
        async fn resume_preserves_prior_fields_and_messages() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Opening."))
                .with_turn(DialogueTurn::reply("Noted.").with_tool_call(record(
                    FieldAssignment::EntityType("Guardian".to_string()),
                    0.9,
                )));
            let manager = manager(dialogue);
            let entity = EntityId::new();

            let created = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            manager
                .chat(&created.session.id(), "A guardian", ChatOptions::default())
                .await
                .unwrap();

            let resumed = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            assert!(resumed.resumed);
            assert!(resumed.session.messages().len() > 1);
            assert_eq!(
                resumed.session.extracted_fields().entity_type.as_deref(),
                Some("Guardian")
            );
        }

        #[tokio::test]
        async fn terminal_session_is_not_resumed() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("First opening."))
                .with_turn(DialogueTurn::reply("Second opening."));
            let manager = manager(dialogue);
            let entity = EntityId::new();

            let first = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            manager.abandon_session(&first.session.id()).await.unwrap();

            let second = manager
                .get_or_create_session_for_entity(user(), entity, None, None)
                .await
                .unwrap();
            assert!(!second.resumed);
            assert_ne!(first.session.id(), second.session.id());
        }
    }

    mod chat {
        use super::*;

        #[tokio::test]
        async fn appends_user_and_assistant_messages_in_order() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(DialogueTurn::reply("Tell me more."));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager
                .chat(&session.id(), "I met a guardian", ChatOptions::default())
                .await
                .unwrap();

            let stored = manager.get_session(&session.id()).await.unwrap();
            let roles: Vec<MessageRole> = stored.messages().iter().map(|m| m.role).collect();
            assert_eq!(
                roles,
                vec![MessageRole::Assistant, MessageRole::User, MessageRole::Assistant]
            );
            assert_eq!(stored.messages()[1].content, "I met a guardian");
        }

        #[tokio::test]
        async fn merges_tool_extractions_into_session() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(
                    DialogueTurn::reply("Recorded both.")
                        .with_tool_call(record(
                            FieldAssignment::EntityType("Guardian".to_string()),
                            0.9,
                        ))
                        .with_tool_call(record(
                            FieldAssignment::Domain("Dream Threshold".to_string()),
                            0.8,
                        )),
                );
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            let result = manager
                .chat(&session.id(), "A guardian of dreams", ChatOptions::default())
                .await
                .unwrap();

            assert_eq!(result.extracted.entity_type.as_deref(), Some("Guardian"));
            assert_eq!(result.tools_used.len(), 2);
            assert!(!result.is_complete); // description still missing

            let stored = manager.get_session(&session.id()).await.unwrap();
            assert_eq!(
                stored.extracted_fields().domain.as_deref(),
                Some("Dream Threshold")
            );
        }

        #[tokio::test]
        async fn partial_tool_failure_keeps_successful_contribution() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(
                    DialogueTurn::reply("One of those did not take.")
                        .with_tool_call(record(FieldAssignment::Corporeality(1.7), 0.9))
                        .with_tool_call(record(
                            FieldAssignment::Domain("Dream Threshold".to_string()),
                            0.8,
                        )),
                );
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            let result = manager
                .chat(&session.id(), "Mostly incorporeal", ChatOptions::default())
                .await
                .unwrap();

            assert_eq!(result.tools_used.len(), 2);
            assert!(!result.tools_used[0].success());
            assert!(result.tools_used[1].success());
            assert_eq!(result.extracted.domain.as_deref(), Some("Dream Threshold"));
            assert!(result.extracted.corporeality.is_none());
        }

        #[tokio::test]
        async fn unknown_session_fails_with_not_found() {
            let manager = manager(ScriptedDialogue::new());
            let missing = SessionId::new();

            let result = manager.chat(&missing, "hello", ChatOptions::default()).await;
            assert!(matches!(
                result,
                Err(SessionError::SessionNotFound(id)) if id == missing
            ));
        }

        #[tokio::test]
        async fn terminal_session_fails_with_not_active() {
            let dialogue = ScriptedDialogue::new().with_turn(DialogueTurn::reply("Welcome."));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager.abandon_session(&session.id()).await.unwrap();

            let result = manager
                .chat(&session.id(), "still there?", ChatOptions::default())
                .await;
            assert!(matches!(
                result,
                Err(SessionError::SessionNotActive {
                    status: SessionStatus::Abandoned,
                    ..
                })
            ));
        }

        #[tokio::test]
        async fn dialogue_failure_leaves_session_unmodified() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_failure(ScriptedFailure::Timeout { timeout_secs: 30 });
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            let before = manager.get_session(&session.id()).await.unwrap();

            let result = manager
                .chat(&session.id(), "lost words", ChatOptions::default())
                .await;
            assert!(matches!(result, Err(SessionError::Dialogue(_))));

            let after = manager.get_session(&session.id()).await.unwrap();
            assert_eq!(after, before);
        }
    }

    mod commit {
        use super::*;

        /// Starts a session and runs one chat turn so the scripted
        /// recording turn lands in the session.
        async fn interviewed_session(manager: &TestManager) -> SessionId {
            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager
                .chat(&session.id(), "details", ChatOptions::default())
                .await
                .unwrap();
            session.id()
        }

        fn dialogue_recording(assignments: Vec<FieldAssignment>) -> ScriptedDialogue {
            let mut turn = DialogueTurn::reply("Recorded.");
            for assignment in assignments {
                turn = turn.with_tool_call(ToolRequest::RecordField {
                    assignment,
                    confidence: Some(1.0),
                });
            }
            ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(turn)
        }

        #[tokio::test]
        async fn commit_fails_with_exact_missing_fields() {
            let manager = manager(dialogue_recording(vec![
                FieldAssignment::EntityType("Guardian".to_string()),
                FieldAssignment::Domain("Dream Threshold".to_string()),
            ]));
            let id = interviewed_session(&manager).await;

            let err = manager.commit_to_archive(&id).await.unwrap_err();
            match err {
                SessionError::MissingRequiredFields(missing) => {
                    assert_eq!(missing, vec![FieldName::Description]);
                }
                other => panic!("expected MissingRequiredFields, got {:?}", other),
            }

            // Session stays active for the interview to continue.
            let stored = manager.get_session(&id).await.unwrap();
            assert_eq!(stored.status(), SessionStatus::Active);
        }

        #[tokio::test]
        async fn commit_succeeds_with_all_required_fields() {
            let manager = manager(dialogue_recording(vec![
                FieldAssignment::EntityType("Guardian".to_string()),
                FieldAssignment::Domain("Dream Threshold".to_string()),
                FieldAssignment::Description("Keeps the gate of sleep".to_string()),
            ]));
            let id = interviewed_session(&manager).await;

            let entity = manager.commit_to_archive(&id).await.unwrap();
            assert_eq!(entity.fields().entity_type.as_deref(), Some("Guardian"));
            assert_eq!(entity.session_id(), id);

            let stored = manager.get_session(&id).await.unwrap();
            assert_eq!(stored.status(), SessionStatus::Completed);
        }

        #[tokio::test]
        async fn recommit_fails_with_not_active() {
            let manager = manager(dialogue_recording(vec![
                FieldAssignment::EntityType("Guardian".to_string()),
                FieldAssignment::Domain("Dream Threshold".to_string()),
                FieldAssignment::Description("Keeps the gate".to_string()),
            ]));
            let id = interviewed_session(&manager).await;

            manager.commit_to_archive(&id).await.unwrap();
            let result = manager.commit_to_archive(&id).await;
            assert!(matches!(
                result,
                Err(SessionError::SessionNotActive {
                    status: SessionStatus::Completed,
                    ..
                })
            ));
        }

        #[tokio::test]
        async fn archive_failure_keeps_session_active() {
            let dialogue = dialogue_recording(vec![
                FieldAssignment::EntityType("Guardian".to_string()),
                FieldAssignment::Domain("Dream Threshold".to_string()),
                FieldAssignment::Description("Keeps the gate".to_string()),
            ]);
            let manager = SessionManager::new(
                Arc::new(InMemorySessionStore::new()),
                Arc::new(dialogue),
                Arc::new(InMemoryEntityArchive::failing("index offline")),
                FieldMerger::default(),
            );
            let id = interviewed_session(&manager).await;

            let result = manager.commit_to_archive(&id).await;
            assert!(matches!(result, Err(SessionError::Archive(_))));

            let stored = manager.get_session(&id).await.unwrap();
            assert_eq!(stored.status(), SessionStatus::Active);
        }

        #[tokio::test]
        async fn commit_unknown_session_fails_with_not_found() {
            let manager = manager(ScriptedDialogue::new());
            let result = manager.commit_to_archive(&SessionId::new()).await;
            assert!(matches!(result, Err(SessionError::SessionNotFound(_))));
        }
    }

    mod abandon {
        use super::*;

        #[tokio::test]
        async fn abandon_transitions_and_blocks_further_turns() {
            let dialogue = ScriptedDialogue::new().with_turn(DialogueTurn::reply("Welcome."));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager.abandon_session(&session.id()).await.unwrap();

            let stored = manager.get_session(&session.id()).await.unwrap();
            assert_eq!(stored.status(), SessionStatus::Abandoned);

            let result = manager
                .chat(&session.id(), "hello?", ChatOptions::default())
                .await;
            assert!(matches!(result, Err(SessionError::SessionNotActive { .. })));
        }

        #[tokio::test]
        async fn abandon_ignores_incomplete_fields() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(DialogueTurn::reply("Noted.").with_tool_call(record(
                    FieldAssignment::EntityType("Guardian".to_string()),
                    0.9,
                )));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager
                .chat(&session.id(), "A guardian", ChatOptions::default())
                .await
                .unwrap();

            // Fields are partial, abandon succeeds regardless.
            manager.abandon_session(&session.id()).await.unwrap();
        }

        #[tokio::test]
        async fn abandon_unknown_session_fails_with_not_found() {
            let manager = manager(ScriptedDialogue::new());
            let result = manager.abandon_session(&SessionId::new()).await;
            assert!(matches!(result, Err(SessionError::SessionNotFound(_))));
        }

        #[tokio::test]
        async fn abandon_terminal_session_fails_with_not_active() {
            let dialogue = ScriptedDialogue::new().with_turn(DialogueTurn::reply("Welcome."));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            manager.abandon_session(&session.id()).await.unwrap();

            let result = manager.abandon_session(&session.id()).await;
            assert!(matches!(result, Err(SessionError::SessionNotActive { .. })));
        }
    }

    mod warnings_and_completeness {
        use super::*;
        use crate::domain::session::ConflictSeverity;

        #[tokio::test]
        async fn blocking_conflict_defeats_completeness_until_refreshed() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(
                    DialogueTurn::reply("All three recorded.")
                        .with_tool_call(record(
                            FieldAssignment::EntityType("Guardian".to_string()),
                            1.0,
                        ))
                        .with_tool_call(record(
                            FieldAssignment::Domain("Dream Threshold".to_string()),
                            1.0,
                        ))
                        .with_tool_call(record(
                            FieldAssignment::Description("Keeps the gate".to_string()),
                            1.0,
                        )),
                )
                .with_turn(
                    DialogueTurn::reply("That contradicts the plaque.").with_tool_call(
                        ToolRequest::FlagConflict {
                            field: FieldName::Domain,
                            note: "Witness and plaque disagree on the domain".to_string(),
                            severity: ConflictSeverity::Blocking,
                        },
                    ),
                )
                .with_turn(
                    DialogueTurn::reply("Domain confirmed.").with_tool_call(record(
                        FieldAssignment::Domain("Dream Threshold".to_string()),
                        1.0,
                    )),
                );
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            let id = session.id();

            let full = manager
                .chat(&id, "It is the dream guardian", ChatOptions::default())
                .await
                .unwrap();
            assert!(full.is_complete);

            let disputed = manager
                .chat(&id, "Actually the plaque says otherwise", ChatOptions::default())
                .await
                .unwrap();
            assert!(!disputed.is_complete);
            assert_eq!(disputed.warnings.len(), 1);

            let confirmed = manager
                .chat(&id, "The plaque is outdated", ChatOptions::default())
                .await
                .unwrap();
            assert!(confirmed.is_complete);

            // The disputed warning is retained, superseded.
            let stored = manager.get_session(&id).await.unwrap();
            assert_eq!(stored.warnings().len(), 1);
            assert!(stored.warnings()[0].is_superseded());
        }

        #[tokio::test]
        async fn relationship_suggestions_surface_in_turn_result() {
            let dialogue = ScriptedDialogue::new()
                .with_turn(DialogueTurn::reply("Welcome."))
                .with_turn(DialogueTurn::reply("Noted the kinship.").with_tool_call(
                    ToolRequest::SuggestRelationship {
                        target: "The Doorwarden".to_string(),
                        relation: "sibling of".to_string(),
                        note: None,
                    },
                ));
            let manager = manager(dialogue);

            let session = manager
                .start_session(StartSessionRequest::new())
                .await
                .unwrap();
            let result = manager
                .chat(&session.id(), "It resembles the Doorwarden", ChatOptions::default())
                .await
                .unwrap();

            assert_eq!(result.suggested_relationships.len(), 1);
            assert_eq!(result.suggested_relationships[0].target, "The Doorwarden");
        }
    }
}
