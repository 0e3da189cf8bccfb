//! Dialogue turn processing.
//!
//! Drives one conversational exchange: assembles the outbound request,
//! invokes the dialogue service exactly once, routes tool calls through the
//! orchestrator, and packages the results for merging.

use std::sync::Arc;

use tracing::debug;

use crate::domain::catalog::{EntityContext, EntityFields, MediaAnalysis};
use crate::domain::session::Session;
use crate::domain::tools::{ToolInvocationRecord, ToolOrchestrator, TurnEffects};
use crate::ports::{ConverseRequest, DialogueError, DialogueService};

/// Everything one turn produced, ready for the field merger.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant's reply text.
    pub reply: String,
    /// Accumulated tool effects (field patch, conflicts, relationships).
    pub effects: TurnEffects,
    /// One audit record per attempted tool call.
    pub tools_used: Vec<ToolInvocationRecord>,
    /// Completeness signal: service-reported, else the mean of the turn's
    /// field-assertion confidences, else none.
    pub completeness_signal: Option<f32>,
    /// Follow-up questions the model proposes.
    pub follow_up_questions: Vec<String>,
}

/// Processes dialogue turns against the dialogue service port.
pub struct TurnProcessor<D> {
    dialogue: Arc<D>,
    orchestrator: ToolOrchestrator,
}

impl<D> TurnProcessor<D>
where
    D: DialogueService,
{
    /// Creates a processor over the given dialogue service.
    pub fn new(dialogue: Arc<D>) -> Self {
        Self {
            dialogue,
            orchestrator: ToolOrchestrator::new(),
        }
    }

    /// Requests the opening assistant message for a new session.
    pub async fn opening_turn(
        &self,
        known_fields: EntityFields,
        entity_context: Option<EntityContext>,
        media_analysis: Option<MediaAnalysis>,
    ) -> Result<TurnOutcome, DialogueError> {
        let request = ConverseRequest::opening()
            .with_known_fields(known_fields)
            .with_entity_context(entity_context)
            .with_media_analysis(media_analysis);
        self.run(request).await
    }

    /// Processes one user turn against the session's transcript.
    ///
    /// The session itself is not mutated; the caller owns persistence.
    pub async fn process(
        &self,
        session: &Session,
        user_message: &str,
        image_url: Option<String>,
        entity_context: Option<EntityContext>,
    ) -> Result<TurnOutcome, DialogueError> {
        let request = ConverseRequest::turn(session.messages().to_vec(), user_message)
            .with_known_fields(session.extracted_fields().clone())
            .with_entity_context(entity_context)
            .with_image_url(image_url);
        self.run(request).await
    }

    async fn run(&self, request: ConverseRequest) -> Result<TurnOutcome, DialogueError> {
        let turn = self.dialogue.converse(request).await?;

        let (effects, tools_used) = self.orchestrator.execute_all(turn.tool_calls);
        let completeness_signal = turn.completeness_signal.or_else(|| effects.mean_assertion());

        debug!(
            tool_count = tools_used.len(),
            signal = ?completeness_signal,
            "dialogue turn processed"
        );

        Ok(TurnOutcome {
            reply: turn.reply,
            effects,
            tools_used,
            completeness_signal,
            follow_up_questions: turn.follow_up_questions,
        })
    }
}
