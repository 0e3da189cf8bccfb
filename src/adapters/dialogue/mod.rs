//! Dialogue service adapters.

mod anthropic;
mod scripted;

pub use anthropic::{AnthropicDialogue, AnthropicDialogueConfig};
pub use scripted::{ScriptedDialogue, ScriptedFailure};
