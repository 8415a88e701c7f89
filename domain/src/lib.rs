//! Domain layer for scholar-debate
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Debate
//!
//! Debate is the central concept in scholar-debate: a **proposer** model
//! produces and refines a candidate answer while a **reviewer** model
//! critiques it, until the reviewer signals approval (consensus) or a
//! bounded number of rounds is exhausted.
//!
//! ## Single / Debate modes
//!
//! - **Single** (default): one model, one pass, with a streaming path and
//!   an automatic non-streaming fallback on truncated output
//! - **Debate**: two models alternating propose/review rounds

pub mod core;
pub mod debate;
pub mod model;
pub mod prompt;
pub mod solve;

// Re-export commonly used types
pub use crate::core::error::DomainError;
pub use crate::core::question::{ImageAttachment, Question};
pub use debate::{
    consensus::{ConsensusPolicy, SubstringApproval},
    state::{DebateOutcome, DebateState},
};
pub use model::config::{DebateModels, ModelConfig};
pub use prompt::{ConversationTurn, PromptTemplate, TurnRole, MAX_HISTORY_TURNS};
pub use solve::{
    event::StreamEvent,
    predicates::{
        extracted_answer_is_blank, finish_reason_is_length, is_blank_output,
        is_incomplete_output, missing_answer_label,
    },
    result::{extract_labeled_answer, FollowUpResult, SolveResult, UNRECOGNIZED_QUESTION},
};
