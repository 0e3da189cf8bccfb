//! Session aggregate and its value objects.

mod aggregate;
mod message;
mod status;
mod warning;

pub use aggregate::{Session, SessionStateError};
pub use message::{ChatMessage, MessageRole};
pub use status::SessionStatus;
pub use warning::{ConflictSeverity, ConflictWarning};
