//! Prompt templates for solve, debate, and follow-up flows

pub mod template;

pub use template::{ConversationTurn, PromptTemplate, TurnRole, MAX_HISTORY_TURNS};
