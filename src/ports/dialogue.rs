//! Dialogue service port.
//!
//! Abstracts the external language-model dialogue service. Implementations
//! translate between the provider API and the core's typed turn model;
//! provider tool-call output is parsed into the closed [`ToolRequest`] union
//! before it crosses this boundary.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::{EntityContext, EntityFields, MediaAnalysis};
use crate::domain::session::ChatMessage;
use crate::domain::tools::{ToolRequest, FLAG_CONFLICT, RECORD_FIELD, SUGGEST_RELATIONSHIP};

/// Port for the language-model dialogue service.
///
/// `converse` is invoked exactly once per turn; a call either returns one
/// completed dialogue turn or one error. Transient-failure retry, if any,
/// happens inside the implementation.
#[async_trait]
pub trait DialogueService: Send + Sync {
    /// Produces the next assistant turn for the given request.
    async fn converse(&self, request: ConverseRequest) -> Result<DialogueTurn, DialogueError>;
}

/// Outbound request for one dialogue turn.
#[derive(Debug, Clone)]
pub struct ConverseRequest {
    /// Prior transcript, oldest first.
    pub history: Vec<ChatMessage>,
    /// The new user input; `None` for the opening turn.
    pub user_message: Option<String>,
    /// Optional image the user attached to this turn.
    pub image_url: Option<String>,
    /// Fields already extracted, so the model avoids re-asking.
    pub known_fields: EntityFields,
    /// Prior-entity grounding, if the session catalogs a known entity.
    pub entity_context: Option<EntityContext>,
    /// Vision-analysis grounding, if media was uploaded.
    pub media_analysis: Option<MediaAnalysis>,
    /// Tools the model may invoke this turn.
    pub tools: Vec<ToolSpec>,
}

impl ConverseRequest {
    /// Creates an opening-turn request (no history, no user message).
    pub fn opening() -> Self {
        Self {
            history: Vec::new(),
            user_message: None,
            image_url: None,
            known_fields: EntityFields::new(),
            entity_context: None,
            media_analysis: None,
            tools: standard_tool_specs().to_vec(),
        }
    }

    /// Creates a request for a follow-up turn.
    pub fn turn(history: Vec<ChatMessage>, user_message: impl Into<String>) -> Self {
        Self {
            history,
            user_message: Some(user_message.into()),
            image_url: None,
            known_fields: EntityFields::new(),
            entity_context: None,
            media_analysis: None,
            tools: standard_tool_specs().to_vec(),
        }
    }

    /// Sets the known fields.
    pub fn with_known_fields(mut self, fields: EntityFields) -> Self {
        self.known_fields = fields;
        self
    }

    /// Sets the entity grounding context.
    pub fn with_entity_context(mut self, context: Option<EntityContext>) -> Self {
        self.entity_context = context;
        self
    }

    /// Sets the media-analysis grounding.
    pub fn with_media_analysis(mut self, analysis: Option<MediaAnalysis>) -> Self {
        self.media_analysis = analysis;
        self
    }

    /// Sets the attached image URL.
    pub fn with_image_url(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    /// Returns true if this is an opening-turn request.
    pub fn is_opening(&self) -> bool {
        self.user_message.is_none() && self.history.is_empty()
    }
}

/// One completed assistant turn from the dialogue service.
#[derive(Debug, Clone, Default)]
pub struct DialogueTurn {
    /// The assistant's textual reply.
    pub reply: String,
    /// Tool calls the model requested, in order.
    pub tool_calls: Vec<ToolRequest>,
    /// Model-reported completeness signal in [0, 1], if any.
    pub completeness_signal: Option<f32>,
    /// Follow-up questions the model proposes asking next.
    pub follow_up_questions: Vec<String>,
}

impl DialogueTurn {
    /// Creates a plain conversational reply with no tool calls.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            ..Default::default()
        }
    }

    /// Adds a tool call.
    pub fn with_tool_call(mut self, call: ToolRequest) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Sets the completeness signal.
    pub fn with_completeness_signal(mut self, signal: f32) -> Self {
        self.completeness_signal = Some(signal);
        self
    }

    /// Adds a follow-up question.
    pub fn with_follow_up(mut self, question: impl Into<String>) -> Self {
        self.follow_up_questions.push(question.into());
        self
    }
}

/// Declaration of an invocable tool, in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Wire name of the tool.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON Schema of the tool's input.
    pub input_schema: serde_json::Value,
}

static STANDARD_TOOLS: Lazy<Vec<ToolSpec>> = Lazy::new(|| {
    let field_names = serde_json::json!([
        "type",
        "domain",
        "description",
        "corporeality",
        "luminance",
        "temperament",
        "lore",
        "capabilities"
    ]);
    vec![
        ToolSpec {
            name: RECORD_FIELD.to_string(),
            description: "Record one extracted entity field value. Use whenever the \
                          conversation establishes or revises a field."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "assignment": {
                        "type": "object",
                        "properties": {
                            "field": { "type": "string", "enum": field_names.clone() },
                            "value": {
                                "description": "The field value; a string, a number in [0,1] \
                                                for corporeality/luminance, or an array of \
                                                strings for capabilities"
                            }
                        },
                        "required": ["field", "value"]
                    },
                    "confidence": {
                        "type": "number",
                        "minimum": 0.0,
                        "maximum": 1.0,
                        "description": "How confident the conversation makes this value"
                    }
                },
                "required": ["assignment"]
            }),
        },
        ToolSpec {
            name: FLAG_CONFLICT.to_string(),
            description: "Flag that newly learned information conflicts with an earlier \
                          field value or is otherwise uncertain."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "field": { "type": "string", "enum": field_names },
                    "note": { "type": "string" },
                    "severity": { "type": "string", "enum": ["advisory", "blocking"] }
                },
                "required": ["field", "note", "severity"]
            }),
        },
        ToolSpec {
            name: SUGGEST_RELATIONSHIP.to_string(),
            description: "Suggest a relationship between this entity and another archive \
                          entity mentioned in conversation."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "target": { "type": "string" },
                    "relation": { "type": "string" },
                    "note": { "type": "string" }
                },
                "required": ["target", "relation"]
            }),
        },
    ]
});

/// The standard tool roster offered on every turn.
pub fn standard_tool_specs() -> &'static [ToolSpec] {
    &STANDARD_TOOLS
}

/// Dialogue service errors.
///
/// Any of these fails the whole turn; the session is left unmodified and the
/// caller may retry.
#[derive(Debug, Clone, Error)]
pub enum DialogueError {
    /// The request timed out.
    #[error("dialogue request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider unavailable.
    #[error("dialogue service unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("dialogue service authentication failed")]
    AuthenticationFailed,

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Provider response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The request itself was rejected as invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DialogueError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DialogueError::Timeout { .. }
                | DialogueError::RateLimited { .. }
                | DialogueError::Unavailable { .. }
                | DialogueError::Network(_)
        )
    }
}
