//! Follow-up use case.
//!
//! A conversation continuation over a fixed (base question, base answer,
//! history) context plus a new follow-up prompt. Structurally the same
//! two loops as solve/debate; history is truncated to the most recent
//! turns inside the prompt template. The debate variant's reviewer checks
//! whether the answer actually addresses the follow-up prompt, not just
//! whether it is correct in isolation.

use crate::ports::model_invoker::{ChatMessage, ModelInvoker, TokenUsage};
use crate::ports::progress::ProgressSink;
use crate::ports::token_estimator::TokenEstimator;
use crate::stream::consumer::consume_stream;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::solve_single::SolveError;
use scholar_domain::{
    finish_reason_is_length, is_blank_output, ConsensusPolicy, ConversationTurn, DebateState,
    FollowUpResult, PromptTemplate, Question, SolveResult, StreamEvent, SubstringApproval,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Input for the [`FollowUpUseCase`].
#[derive(Debug, Clone)]
pub struct FollowUpInput {
    /// The originally solved question.
    pub base_question: String,
    /// The answer previously given for it.
    pub base_answer: String,
    /// Prior conversation turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The new follow-up question.
    pub prompt: String,
    /// Stream deltas through the progress sink (single variant only).
    pub streaming: bool,
    pub cancel: Option<CancellationToken>,
}

impl FollowUpInput {
    pub fn new(
        base_question: impl Into<String>,
        base_answer: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            base_question: base_question.into(),
            base_answer: base_answer.into(),
            history: Vec::new(),
            prompt: prompt.into(),
            streaming: true,
            cancel: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Terminal outcome of a follow-up debate run.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpOutcome {
    pub result: FollowUpResult,
    pub consensus_reached: bool,
    pub iterations: u32,
}

/// Use case for answering a follow-up question, single-pass or debated.
pub struct FollowUpUseCase {
    proposer: Arc<dyn ModelInvoker>,
    reviewer: Arc<dyn ModelInvoker>,
    estimator: Arc<dyn TokenEstimator>,
    policy: Box<dyn ConsensusPolicy>,
}

impl FollowUpUseCase {
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

    pub fn with_policy(mut self, policy: Box<dyn ConsensusPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Single-pass follow-up: one model call, streamed with a buffered
    /// fallback on blank or length-truncated output. Follow-up answers
    /// carry no `解答:` label, so only those two signals apply.
    pub async fn execute_single(
        &self,
        input: FollowUpInput,
        progress: &dyn ProgressSink,
    ) -> Result<FollowUpResult, SolveError> {
        check_cancelled(&input.cancel)?;

        let prompt = PromptTemplate::follow_up(
            &input.base_question,
            &input.base_answer,
            &input.history,
            &input.prompt,
        );
        let messages = vec![ChatMessage::user(prompt.clone())];

        let outcome = if input.streaming {
            self.answer_streamed(&messages, &prompt, &input.cancel, progress)
                .await
        } else {
            self.answer_buffered(&messages, &prompt).await
        };

        match outcome {
            Ok(result) => {
                progress.on_event(&StreamEvent::Complete {
                    value: result.answer.clone(),
                    result: SolveResult::new(input.prompt.clone(), result.answer.clone()),
                });
                Ok(result)
            }
            Err(err) => {
                // Error events belong to the streamed protocol; buffered
                // callers get the returned error only.
                if input.streaming && !err.is_cancelled() {
                    progress.on_event(&StreamEvent::error(err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Debated follow-up: the same propose/review loop as the main debate,
    /// over the follow-up templates.
    pub async fn execute_debate(
        &self,
        input: FollowUpInput,
        max_iterations: u32,
        progress: &dyn ProgressSink,
    ) -> Result<FollowUpOutcome, SolveError> {
        check_cancelled(&input.cancel)?;

        info!(max_iterations, "starting follow-up debate");
        let mut state = DebateState::new(
            Question::Text(input.prompt.clone()),
            None,
            max_iterations,
        );

        let run = self
            .follow_up_loop(&input, &mut state, progress)
            .await;

        match run {
            Ok(()) => {
                let consensus_reached = state.consensus_reached;
                let iterations = state.iteration;
                let tokens = state.tokens_used;
                let result = FollowUpResult::new(state.answer()).with_tokens(tokens);
                Ok(FollowUpOutcome {
                    result,
                    consensus_reached,
                    iterations,
                })
            }
            Err(err) => {
                if !err.is_cancelled() {
                    progress.on_event(&StreamEvent::error(err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn follow_up_loop(
        &self,
        input: &FollowUpInput,
        state: &mut DebateState,
        progress: &dyn ProgressSink,
    ) -> Result<(), SolveError> {
        while state.should_continue() {
            let round = state.iteration + 1;

            check_cancelled(&input.cancel)?;
            progress.on_event(&StreamEvent::status("提议模型回答追问中…", round));
            let prompt = if state.is_first_round() {
                PromptTemplate::follow_up(
                    &input.base_question,
                    &input.base_answer,
                    &input.history,
                    &input.prompt,
                )
            } else {
                PromptTemplate::follow_up_refinement(
                    &input.prompt,
                    &state.proposer_answer,
                    &state.reviewer_verdict,
                )
            };
            let messages = vec![ChatMessage::user(prompt.clone())];
            let completion = self.proposer.invoke(&messages).await?;
            let tokens = self.tokens_for(&prompt, &completion.content, completion.usage);
            state.record_proposal(completion.content, tokens);
            progress.on_event(&StreamEvent::Model1 {
                content: state.proposer_answer.clone(),
                iteration: round,
            });

            check_cancelled(&input.cancel)?;
            progress.on_event(&StreamEvent::status("审查模型审查中…", round));
            let prompt = PromptTemplate::follow_up_review(&input.prompt, &state.proposer_answer);
            let messages = vec![ChatMessage::user(prompt.clone())];
            let completion = self.reviewer.invoke(&messages).await?;
            let tokens = self.tokens_for(&prompt, &completion.content, completion.usage);
            let approved = self.policy.is_approved(&completion.content);
            debug!(round, approved, "follow-up verdict recorded");
            state.record_verdict(completion.content, tokens, approved);
            progress.on_event(&StreamEvent::Model2 {
                content: state.reviewer_verdict.clone(),
                iteration: round,
            });
        }
        Ok(())
    }

    async fn answer_streamed(
        &self,
        messages: &[ChatMessage],
        prompt: &str,
        cancel: &Option<CancellationToken>,
        progress: &dyn ProgressSink,
    ) -> Result<FollowUpResult, SolveError> {
        progress.on_event(&StreamEvent::Start);

        let handle = self.proposer.stream_invoke(messages).await?;
        let consumed = consume_stream(
            handle,
            |delta| progress.on_event(&StreamEvent::delta(delta)),
            cancel,
        )
        .await?;

        if is_blank_output(&consumed.content)
            || finish_reason_is_length(consumed.finish_reason.as_deref())
        {
            warn!(
                finish_reason = ?consumed.finish_reason,
                "streamed follow-up incomplete, replaying without streaming"
            );
            return self.answer_buffered(messages, prompt).await;
        }

        let tokens = match consumed.tokens_used {
            Some(tokens) => tokens,
            None => self.estimate_tokens(prompt, &consumed.content),
        };
        Ok(FollowUpResult::new(consumed.content).with_tokens(tokens))
    }

    async fn answer_buffered(
        &self,
        messages: &[ChatMessage],
        prompt: &str,
    ) -> Result<FollowUpResult, SolveError> {
        let completion = self.proposer.invoke(messages).await?;
        let tokens = match completion.usage {
            Some(usage) => usage.total_tokens,
            None => self.estimate_tokens(prompt, &completion.content),
        };
        Ok(FollowUpResult::new(completion.content).with_tokens(tokens))
    }

    fn tokens_for(&self, prompt: &str, answer: &str, usage: Option<TokenUsage>) -> u32 {
        match usage {
            Some(usage) => usage.total_tokens,
            None => self.estimate_tokens(prompt, answer),
        }
    }

    fn estimate_tokens(&self, prompt: &str, answer: &str) -> u32 {
        self.estimator.estimate(prompt) + self.estimator.estimate(answer)
    }
}
