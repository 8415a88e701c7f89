//! Application layer for scholar-debate
//!
//! Use cases (single-pass solve, debate, follow-up) and the ports they
//! depend on. Infrastructure adapters implement the ports; the CLI wires
//! everything together.

pub mod ports;
pub mod stream;
pub mod use_cases;

pub use ports::model_invoker::{
    ChatMessage, Completion, ContentPart, InvokerError, ModelInvoker, Role, StreamHandle,
    TokenUsage,
};
pub use ports::progress::{NoProgress, ProgressSink};
pub use ports::token_estimator::TokenEstimator;
pub use stream::consumer::{consume_stream, ConsumedStream};
pub use use_cases::follow_up::{FollowUpInput, FollowUpOutcome, FollowUpUseCase};
pub use use_cases::run_debate::{RunDebateInput, RunDebateUseCase};
pub use use_cases::solve_single::{SolveError, SolveSingleInput, SolveSingleUseCase};
