//! Application layer: turn processing and session lifecycle orchestration.

mod session_manager;
mod turn;

pub use session_manager::{
    ChatOptions, EntitySession, SessionError, SessionManager, StartSessionRequest, TurnResult,
};
pub use turn::{TurnOutcome, TurnProcessor};
