//! Tool requests emitted by the dialogue service and their execution.

mod invocation;
mod orchestrator;
mod request;

pub use invocation::ToolInvocationRecord;
pub use orchestrator::{ToolOrchestrator, TurnEffects};
pub use request::{
    RelationshipSuggestion, ToolRequest, FLAG_CONFLICT, RECORD_FIELD, SUGGEST_RELATIONSHIP,
};
