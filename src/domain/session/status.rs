//! Session lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a cataloging session.
///
/// `Active` is the initial state and the only state transitions occur from;
/// `Completed` and `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Interview in progress; accepts turns.
    Active,
    /// Entity was committed to the archive.
    Completed,
    /// Explicitly abandoned by the caller.
    Abandoned,
}

impl SessionStatus {
    /// Returns true for terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        };
        write!(f, "{}", s)
    }
}
