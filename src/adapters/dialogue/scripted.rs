//! Scripted dialogue service for testing.
//!
//! Plays back a queue of pre-configured turns and failures, recording every
//! request for verification, so tests run without a real model service.
//!
//! # Example
//!
//! ```ignore
//! let dialogue = ScriptedDialogue::new()
//!     .with_turn(DialogueTurn::reply("What did you encounter?"))
//!     .with_failure(ScriptedFailure::Timeout { timeout_secs: 30 });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{ConverseRequest, DialogueError, DialogueService, DialogueTurn};

/// A configured scripted response.
#[derive(Debug, Clone)]
enum ScriptedResponse {
    Turn(DialogueTurn),
    Failure(ScriptedFailure),
}

/// Failure kinds the script can inject.
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    /// Simulate a request timeout.
    Timeout {
        /// Reported timeout.
        timeout_secs: u32,
    },
    /// Simulate rate limiting.
    RateLimited {
        /// Reported retry-after.
        retry_after_secs: u32,
    },
    /// Simulate the provider being down.
    Unavailable {
        /// Error details.
        message: String,
    },
    /// Simulate an authentication failure.
    AuthenticationFailed,
    /// Simulate a network error.
    Network {
        /// Error details.
        message: String,
    },
    /// Simulate an unparseable provider response.
    Parse {
        /// Error details.
        message: String,
    },
}

impl From<ScriptedFailure> for DialogueError {
    fn from(failure: ScriptedFailure) -> Self {
        match failure {
            ScriptedFailure::Timeout { timeout_secs } => DialogueError::Timeout { timeout_secs },
            ScriptedFailure::RateLimited { retry_after_secs } => DialogueError::RateLimited {
                retry_after_secs,
            },
            ScriptedFailure::Unavailable { message } => DialogueError::unavailable(message),
            ScriptedFailure::AuthenticationFailed => DialogueError::AuthenticationFailed,
            ScriptedFailure::Network { message } => DialogueError::network(message),
            ScriptedFailure::Parse { message } => DialogueError::parse(message),
        }
    }
}

/// Scripted dialogue service.
///
/// Responses are consumed in order; when the queue runs dry the service
/// returns a default conversational reply. Clones share the same queue and
/// call history.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDialogue {
    responses: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    calls: Arc<Mutex<Vec<ConverseRequest>>>,
}

impl ScriptedDialogue {
    /// Creates a service with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful turn.
    pub fn with_turn(self, turn: DialogueTurn) -> Self {
        self.responses
            .lock()
            .expect("script poisoned")
            .push_back(ScriptedResponse::Turn(turn));
        self
    }

    /// Queues a failure.
    pub fn with_failure(self, failure: ScriptedFailure) -> Self {
        self.responses
            .lock()
            .expect("script poisoned")
            .push_back(ScriptedResponse::Failure(failure));
        self
    }

    /// Returns every request seen so far.
    pub fn calls(&self) -> Vec<ConverseRequest> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Returns the number of requests seen.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("call log poisoned").len()
    }

    fn next_response(&self) -> ScriptedResponse {
        self.responses
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                ScriptedResponse::Turn(DialogueTurn::reply("Tell me more about the entity."))
            })
    }
}

#[async_trait]
impl DialogueService for ScriptedDialogue {
    async fn converse(&self, request: ConverseRequest) -> Result<DialogueTurn, DialogueError> {
        self.calls.lock().expect("call log poisoned").push(request);

        match self.next_response() {
            ScriptedResponse::Turn(turn) => Ok(turn),
            ScriptedResponse::Failure(failure) => Err(failure.into()),
        }
    }
}
