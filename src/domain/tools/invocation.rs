//! Tool invocation audit records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ToolInvocationId};

/// One audit row per attempted tool call.
///
/// Records are purely additive: every call produces exactly one, success or
/// failure, and nothing mutates a record after completion. They are surfaced
/// to the caller as `tools_used` and never merged into extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    id: ToolInvocationId,
    name: String,
    success: bool,
    error: Option<String>,
    started_at: Timestamp,
    completed_at: Timestamp,
    duration_ms: u32,
}

impl ToolInvocationRecord {
    /// Starts a record for a tool call about to execute.
    pub fn started(name: impl Into<String>) -> InFlightInvocation {
        InFlightInvocation {
            id: ToolInvocationId::new(),
            name: name.into(),
            started_at: Timestamp::now(),
        }
    }

    /// Returns the record id.
    pub fn id(&self) -> ToolInvocationId {
        self.id
    }

    /// Returns the tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the call succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Returns the error text for failed calls.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns when execution started.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns when execution completed.
    pub fn completed_at(&self) -> Timestamp {
        self.completed_at
    }

    /// Returns the execution duration in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }
}

/// A tool call that has started but not yet completed.
#[derive(Debug)]
pub struct InFlightInvocation {
    id: ToolInvocationId,
    name: String,
    started_at: Timestamp,
}

impl InFlightInvocation {
    /// Completes the record successfully.
    pub fn succeeded(self) -> ToolInvocationRecord {
        self.finish(true, None)
    }

    /// Completes the record with a failure.
    pub fn failed(self, error: impl Into<String>) -> ToolInvocationRecord {
        self.finish(false, Some(error.into()))
    }

    fn finish(self, success: bool, error: Option<String>) -> ToolInvocationRecord {
        let completed_at = Timestamp::now();
        let duration_ms = completed_at.millis_since(&self.started_at).max(0) as u32;
        ToolInvocationRecord {
            id: self.id,
            name: self.name,
            success,
            error,
            started_at: self.started_at,
            completed_at,
            duration_ms,
        }
    }
}
