//! Debate state machine.
//!
//! [`DebateState`] is the mutable record threaded through one debate run.
//! It is created per invocation, mutated in place by each half-round, and
//! discarded after the final structured result is derived. Invariants:
//!
//! - `iteration` only increases (one increment per completed review)
//! - `consensus_reached` can become true only when a verdict is recorded,
//!   never after a proposer round
//! - `final_answer` is `Some` iff `consensus_reached`

use crate::core::question::{ImageAttachment, Question};
use crate::solve::result::{extract_labeled_answer, SolveResult};

/// Mutable per-run debate record.
#[derive(Debug, Clone)]
pub struct DebateState {
    pub question: Question,
    pub extra_prompt: Option<String>,
    /// Latest candidate answer from the proposer.
    pub proposer_answer: String,
    /// Latest verdict from the reviewer.
    pub reviewer_verdict: String,
    /// 0-based count of completed propose/review rounds.
    pub iteration: u32,
    pub max_iterations: u32,
    pub consensus_reached: bool,
    /// Frozen copy of the approved answer; set only on consensus.
    pub final_answer: Option<String>,
    /// Running total across all model calls in this run.
    pub tokens_used: u32,
}

impl DebateState {
    pub fn new(question: Question, extra_prompt: Option<String>, max_iterations: u32) -> Self {
        Self {
            question,
            extra_prompt,
            proposer_answer: String::new(),
            reviewer_verdict: String::new(),
            iteration: 0,
            max_iterations,
            consensus_reached: false,
            final_answer: None,
            tokens_used: 0,
        }
    }

    pub fn images(&self) -> Option<&[ImageAttachment]> {
        self.question.images()
    }

    /// True once on the first proposer round (no prior answer to refine).
    pub fn is_first_round(&self) -> bool {
        self.iteration == 0 && self.proposer_answer.is_empty()
    }

    /// Record the proposer's answer for the current round.
    pub fn record_proposal(&mut self, answer: impl Into<String>, tokens: u32) {
        self.proposer_answer = answer.into();
        self.tokens_used += tokens;
    }

    /// Record the reviewer's verdict, closing the current round.
    ///
    /// On approval the current proposer answer is frozen as the final
    /// answer. The iteration counter advances exactly once per verdict.
    pub fn record_verdict(&mut self, verdict: impl Into<String>, tokens: u32, approved: bool) {
        self.reviewer_verdict = verdict.into();
        self.tokens_used += tokens;
        if approved {
            self.consensus_reached = true;
            self.final_answer = Some(self.proposer_answer.clone());
        }
        self.iteration += 1;
    }

    /// The loop continues while rounds remain and no consensus was reached.
    pub fn should_continue(&self) -> bool {
        self.iteration < self.max_iterations && !self.consensus_reached
    }

    /// The answer this run settles on: the frozen final answer on
    /// consensus, else the last proposer answer (forced terminal).
    pub fn answer(&self) -> &str {
        self.final_answer.as_deref().unwrap_or(&self.proposer_answer)
    }

    /// Derive the structured outcome. Called once at loop exit, not after
    /// every round.
    pub fn into_outcome(self) -> DebateOutcome {
        let result = extract_labeled_answer(self.answer()).with_tokens(self.tokens_used);
        DebateOutcome {
            result,
            consensus_reached: self.consensus_reached,
            iterations: self.iteration,
        }
    }
}

/// Terminal outcome of a debate run. Non-consensus is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DebateOutcome {
    pub result: SolveResult,
    pub consensus_reached: bool,
    /// Completed propose/review rounds.
    pub iterations: u32,
}
