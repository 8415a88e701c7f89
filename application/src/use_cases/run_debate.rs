//! Run Debate use case.
//!
//! Drives the proposer/reviewer loop over a [`DebateState`]: the proposer
//! produces or refines a candidate answer, the reviewer critiques it, and
//! the loop ends on reviewer approval or when the round budget runs out.
//! The two calls of a round are strictly sequential — the reviewer must
//! see the proposer's latest answer. Reaching the round budget without
//! approval is a normal terminal outcome, not an error.

use crate::ports::model_invoker::{ChatMessage, ModelInvoker};
use crate::ports::progress::ProgressSink;
use crate::ports::token_estimator::TokenEstimator;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::solve_single::{build_solve_messages, SolveError};
use scholar_domain::{
    ConsensusPolicy, DebateOutcome, DebateState, PromptTemplate, Question, StreamEvent,
    SubstringApproval,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Input for the [`RunDebateUseCase`].
#[derive(Debug, Clone)]
pub struct RunDebateInput {
    pub question: Question,
    pub extra_prompt: Option<String>,
    /// Maximum propose/review rounds before the forced terminal.
    pub max_iterations: u32,
    pub cancel: Option<CancellationToken>,
}

impl RunDebateInput {
    pub fn new(question: Question, max_iterations: u32) -> Self {
        Self {
            question,
            extra_prompt: None,
            max_iterations,
            cancel: None,
        }
    }

    pub fn with_extra_prompt(mut self, extra: impl Into<String>) -> Self {
        self.extra_prompt = Some(extra.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Use case for running a proposer/reviewer debate.
pub struct RunDebateUseCase {
    proposer: Arc<dyn ModelInvoker>,
    reviewer: Arc<dyn ModelInvoker>,
    estimator: Arc<dyn TokenEstimator>,
    policy: Box<dyn ConsensusPolicy>,
}

impl RunDebateUseCase {
    pub fn new(
        proposer: Arc<dyn ModelInvoker>,
        reviewer: Arc<dyn ModelInvoker>,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        Self {
            proposer,
            reviewer,
            estimator,
            policy: Box::new(SubstringApproval),
        }
    }

    /// Swap the consensus policy (e.g. for a structured verdict).
    pub fn with_policy(mut self, policy: Box<dyn ConsensusPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Execute the debate, reporting progress through `progress`.
    pub async fn execute(
        &self,
        input: RunDebateInput,
        progress: &dyn ProgressSink,
    ) -> Result<DebateOutcome, SolveError> {
        check_cancelled(&input.cancel)?;

        info!(max_iterations = input.max_iterations, "starting debate");
        let mut state = DebateState::new(
            input.question,
            input.extra_prompt,
            input.max_iterations,
        );

        let outcome = self.run_loop(&mut state, &input.cancel, progress).await;

        match outcome {
            Ok(()) => {
                let outcome = state.into_outcome();
                info!(
                    consensus = outcome.consensus_reached,
                    rounds = outcome.iterations,
                    "debate finished"
                );
                Ok(outcome)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    progress.on_event(&StreamEvent::error(err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn run_loop(
        &self,
        state: &mut DebateState,
        cancel: &Option<CancellationToken>,
        progress: &dyn ProgressSink,
    ) -> Result<(), SolveError> {
        while state.should_continue() {
            let round = state.iteration + 1;

            check_cancelled(cancel)?;
            progress.on_event(&StreamEvent::status("提议模型生成解答中…", round));
            self.propose(state).await?;
            progress.on_event(&StreamEvent::Model1 {
                content: state.proposer_answer.clone(),
                iteration: round,
            });

            check_cancelled(cancel)?;
            progress.on_event(&StreamEvent::status("审查模型审查中…", round));
            self.review(state).await?;
            progress.on_event(&StreamEvent::Model2 {
                content: state.reviewer_verdict.clone(),
                iteration: round,
            });
        }
        Ok(())
    }

    /// Proposer half-round: initial prompt on the first round, refinement
    /// prompt (prior answer + reviewer verdict) afterwards.
    async fn propose(&self, state: &mut DebateState) -> Result<(), SolveError> {
        let messages = if state.is_first_round() {
            build_solve_messages(&state.question, state.extra_prompt.as_deref())
        } else {
            let prompt = PromptTemplate::refinement(
                state.question.text(),
                &state.proposer_answer,
                &state.reviewer_verdict,
                state.extra_prompt.as_deref(),
            );
            attach_images(prompt, state)
        };

        let completion = self.proposer.invoke(&messages).await?;
        let tokens = self.tokens_for(&messages, &completion.content, completion.usage);
        debug!(round = state.iteration + 1, tokens, "proposal recorded");
        state.record_proposal(completion.content, tokens);
        Ok(())
    }

    /// Reviewer half-round: critiques the current candidate. Text
    /// questions embed the literal question; image questions re-attach
    /// the images instead.
    async fn review(&self, state: &mut DebateState) -> Result<(), SolveError> {
        let prompt = PromptTemplate::review(state.question.text(), &state.proposer_answer);
        let messages = attach_images(prompt, state);

        let completion = self.reviewer.invoke(&messages).await?;
        let tokens = self.tokens_for(&messages, &completion.content, completion.usage);
        let approved = self.policy.is_approved(&completion.content);
        debug!(round = state.iteration + 1, approved, tokens, "verdict recorded");
        state.record_verdict(completion.content, tokens, approved);
        Ok(())
    }

    fn tokens_for(
        &self,
        messages: &[ChatMessage],
        answer: &str,
        usage: Option<crate::ports::model_invoker::TokenUsage>,
    ) -> u32 {
        match usage {
            Some(usage) => usage.total_tokens,
            None => {
                let prompt: String = messages.iter().map(|m| m.text()).collect();
                self.estimator.estimate(&prompt) + self.estimator.estimate(answer)
            }
        }
    }
}

fn attach_images(prompt: String, state: &DebateState) -> Vec<ChatMessage> {
    match state.images() {
        Some(images) => vec![ChatMessage::user_with_images(prompt, images)],
        None => vec![ChatMessage::user(prompt)],
    }
}
