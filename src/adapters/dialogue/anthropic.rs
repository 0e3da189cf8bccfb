//! Anthropic dialogue adapter.
//!
//! Implements the dialogue port against Anthropic's messages API, using
//! native tool use for field recording. Provider tool-call output is parsed
//! into the typed [`ToolRequest`] union here, at the boundary.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicDialogueConfig::new(api_key)
//!     .with_model("claude-sonnet-4-20250514")
//!     .with_base_url("https://api.anthropic.com");
//!
//! let dialogue = AnthropicDialogue::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::domain::tools::ToolRequest;
use crate::ports::{ConverseRequest, DialogueError, DialogueService, DialogueTurn};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Interviewer instructions sent as the system prompt's fixed preamble.
const INTERVIEWER_PROMPT: &str = "You are the Archivist, a careful cataloging \
assistant. Interview the user about the entity they encountered, one or two \
questions at a time. Whenever the conversation establishes or revises a field, \
call the record_field tool; if new information contradicts an earlier value, \
call flag_conflict instead of silently overwriting; if the user mentions \
another archive entity, call suggest_relationship. Never re-ask about fields \
already recorded.";

/// Configuration for the Anthropic dialogue adapter.
#[derive(Debug, Clone)]
pub struct AnthropicDialogueConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
    /// Maximum tokens to generate per turn.
    pub max_tokens: u32,
}

impl AnthropicDialogueConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            max_tokens: 1024,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Dialogue service backed by Anthropic's messages API.
pub struct AnthropicDialogue {
    config: AnthropicDialogueConfig,
    client: Client,
}

impl AnthropicDialogue {
    /// Creates a new adapter with the given configuration.
    pub fn new(config: AnthropicDialogueConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Builds the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Converts a converse request to Anthropic's format.
    fn to_api_request(&self, request: &ConverseRequest) -> ApiRequest {
        let mut messages = Vec::new();

        // History first. System and tool transcript entries are folded out;
        // the running field state travels in the system prompt instead.
        for message in &request.history {
            let role = match message.role {
                crate::domain::session::MessageRole::User => "user",
                crate::domain::session::MessageRole::Assistant => "assistant",
                _ => continue,
            };
            messages.push(ApiMessage {
                role: role.to_string(),
                content: message.content.clone(),
            });
        }

        if let Some(user_message) = &request.user_message {
            let content = match &request.image_url {
                Some(url) => format!("{}\n[attached image: {}]", user_message, url),
                None => user_message.clone(),
            };
            messages.push(ApiMessage {
                role: "user".to_string(),
                content,
            });
        }

        // The messages API requires at least one message; the opening turn
        // has none, so ask for the greeting explicitly.
        if messages.is_empty() {
            messages.push(ApiMessage {
                role: "user".to_string(),
                content: "Begin the interview with a brief greeting.".to_string(),
            });
        }

        ApiRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: Some(build_system_prompt(request)),
            messages,
            tools: request
                .tools
                .iter()
                .map(|spec| ApiTool {
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    input_schema: spec.input_schema.clone(),
                })
                .collect(),
        }
    }

    /// Sends a request and maps transport errors.
    async fn send_request(&self, api_request: &ApiRequest) -> Result<Response, DialogueError> {
        self.client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DialogueError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    DialogueError::network(format!("Connection failed: {}", e))
                } else {
                    DialogueError::network(e.to_string())
                }
            })
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, DialogueError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(map_error_status(status.as_u16(), &error_body))
    }

    /// Parses a successful response body into a dialogue turn.
    async fn parse_response(&self, response: Response) -> Result<DialogueTurn, DialogueError> {
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::parse(format!("Failed to parse response: {}", e)))?;

        Ok(turn_from_response(api_response))
    }
}

#[async_trait]
impl DialogueService for AnthropicDialogue {
    async fn converse(&self, request: ConverseRequest) -> Result<DialogueTurn, DialogueError> {
        let api_request = self.to_api_request(&request);

        let mut last_error = DialogueError::network("No attempts made");
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            match self.send_request(&api_request).await {
                Ok(response) => match self.handle_response_status(response).await {
                    Ok(response) => return self.parse_response(response).await,
                    Err(err) => {
                        if !err.is_retryable() || retry_count >= self.config.max_retries {
                            return Err(err);
                        }
                        last_error = err;
                    }
                },
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        return Err(err);
                    }
                    last_error = err;
                }
            }

            // Exponential backoff: 1s, 2s, 4s, ...
            let delay = Duration::from_secs(1 << retry_count);
            sleep(delay).await;
            retry_count += 1;
        }

        Err(last_error)
    }
}

/// Builds the system prompt: interviewer instructions plus grounding.
fn build_system_prompt(request: &ConverseRequest) -> String {
    let mut prompt = INTERVIEWER_PROMPT.to_string();

    if !request.known_fields.is_empty() {
        let known = serde_json::to_string(&request.known_fields).unwrap_or_default();
        prompt.push_str("\n\nFields already recorded (do not re-ask): ");
        prompt.push_str(&known);
    }

    if let Some(context) = &request.entity_context {
        let context_json = serde_json::to_string(context).unwrap_or_default();
        prompt.push_str("\n\nThis interview catalogs a known entity: ");
        prompt.push_str(&context_json);
    }

    if let Some(analysis) = &request.media_analysis {
        let analysis_json = serde_json::to_string(analysis).unwrap_or_default();
        prompt.push_str("\n\nVision analysis of the user's uploaded media: ");
        prompt.push_str(&analysis_json);
    }

    prompt
}

/// Maps an error status code to a dialogue error.
fn map_error_status(status: u16, error_body: &str) -> DialogueError {
    match status {
        401 => DialogueError::AuthenticationFailed,
        429 => DialogueError::RateLimited {
            retry_after_secs: parse_retry_after(error_body),
        },
        400 => DialogueError::InvalidRequest(error_body.to_string()),
        500..=599 => {
            DialogueError::unavailable(format!("Server error {}: {}", status, error_body))
        }
        _ => DialogueError::network(format!("Unexpected status {}: {}", status, error_body)),
    }
}

/// Parses retry-after seconds out of an error response body.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = message.find("try again in ") {
                let rest = &message[idx + 13..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse::<u32>() {
                    return secs;
                }
            }
        }
    }
    60 // Anthropic rate limit windows tend to be long
}

/// Assembles a dialogue turn from response content blocks.
///
/// Text blocks concatenate into the reply; tool_use blocks parse into the
/// typed union. A malformed tool block is logged and skipped rather than
/// failing the user's turn.
fn turn_from_response(response: ApiResponse) -> DialogueTurn {
    let mut reply = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block.block_type.as_str() {
            "text" => {
                if let Some(text) = block.text {
                    reply.push_str(&text);
                }
            }
            "tool_use" => {
                let name = block.name.unwrap_or_default();
                let input = block.input.unwrap_or(serde_json::Value::Null);
                match ToolRequest::from_tool_use(&name, input) {
                    Ok(call) => tool_calls.push(call),
                    Err(error) => {
                        warn!(tool = %name, error = %error, "skipping malformed tool call");
                    }
                }
            }
            _ => {}
        }
    }

    DialogueTurn {
        reply,
        tool_calls,
        completeness_signal: None,
        follow_up_questions: Vec::new(),
    }
}

// ----- Anthropic API Types -----

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
    name: Option<String>,
    input: Option<serde_json::Value>,
}
