//! Single-pass solve use case.
//!
//! Builds a prompt from the question, invokes the model once (streamed or
//! buffered), and parses the response into a [`SolveResult`]. Streamed
//! output that fails the completeness check is discarded and the same
//! logical request is replayed as one blocking call — the caller only
//! ever sees a complete-looking answer or an explicit error.

use crate::ports::model_invoker::{ChatMessage, InvokerError, ModelInvoker};
use crate::ports::progress::ProgressSink;
use crate::ports::token_estimator::TokenEstimator;
use crate::stream::consumer::consume_stream;
use crate::use_cases::shared::check_cancelled;
use scholar_domain::{
    extract_labeled_answer, is_incomplete_output, PromptTemplate, Question, SolveResult,
    StreamEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by the solve and debate use cases.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Solve failed: {0}")]
    Failed(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SolveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SolveError::Cancelled)
    }
}

impl From<InvokerError> for SolveError {
    fn from(err: InvokerError) -> Self {
        match err {
            InvokerError::Cancelled => SolveError::Cancelled,
            other => SolveError::Failed(other.to_string()),
        }
    }
}

/// Input for the [`SolveSingleUseCase`].
#[derive(Debug, Clone)]
pub struct SolveSingleInput {
    pub question: Question,
    /// Caller-supplied supplementary instructions appended to the prompt.
    pub extra_prompt: Option<String>,
    /// Stream deltas through the progress sink; off means one blocking call.
    pub streaming: bool,
    pub cancel: Option<CancellationToken>,
}

impl SolveSingleInput {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            extra_prompt: None,
            streaming: true,
            cancel: None,
        }
    }

    pub fn with_extra_prompt(mut self, extra: impl Into<String>) -> Self {
        self.extra_prompt = Some(extra.into());
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

/// Use case for solving one question with a single model pass.
pub struct SolveSingleUseCase {
    invoker: Arc<dyn ModelInvoker>,
    estimator: Arc<dyn TokenEstimator>,
}

impl SolveSingleUseCase {
    pub fn new(invoker: Arc<dyn ModelInvoker>, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { invoker, estimator }
    }

    /// Execute the solve, reporting progress through `progress`.
    pub async fn execute(
        &self,
        input: SolveSingleInput,
        progress: &dyn ProgressSink,
    ) -> Result<SolveResult, SolveError> {
        check_cancelled(&input.cancel)?;

        let messages = build_solve_messages(&input.question, input.extra_prompt.as_deref());
        let prompt_text: String = messages.iter().map(|m| m.text()).collect();

        let outcome = if input.streaming {
            self.solve_streamed(&messages, &prompt_text, &input.cancel, progress)
                .await
        } else {
            self.solve_buffered(&messages, &prompt_text).await
        };

        match outcome {
            Ok(result) => {
                progress.on_event(&StreamEvent::Complete {
                    value: result.answer.clone(),
                    result: result.clone(),
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

    async fn solve_streamed(
        &self,
        messages: &[ChatMessage],
        prompt_text: &str,
        cancel: &Option<CancellationToken>,
        progress: &dyn ProgressSink,
    ) -> Result<SolveResult, SolveError> {
        progress.on_event(&StreamEvent::Start);

        let handle = self.invoker.stream_invoke(messages).await?;
        let consumed = consume_stream(
            handle,
            |delta| progress.on_event(&StreamEvent::delta(delta)),
            cancel,
        )
        .await?;

        debug!(
            deltas = consumed.delta_count,
            events = ?consumed.observed_event_names,
            "stream consumed"
        );

        if is_incomplete_output(&consumed.content, consumed.finish_reason.as_deref()) {
            warn!(
                finish_reason = ?consumed.finish_reason,
                "streamed output incomplete, replaying without streaming"
            );
            // Discard the partial stream entirely — its token count is
            // never read, so the fallback cannot double-count.
            return self.solve_buffered(messages, prompt_text).await;
        }

        let tokens = match consumed.tokens_used {
            Some(tokens) => tokens,
            None => self.estimate_tokens(prompt_text, &consumed.content),
        };
        Ok(extract_labeled_answer(&consumed.content).with_tokens(tokens))
    }

    async fn solve_buffered(
        &self,
        messages: &[ChatMessage],
        prompt_text: &str,
    ) -> Result<SolveResult, SolveError> {
        let completion = self.invoker.invoke(messages).await?;
        let tokens = match completion.usage {
            Some(usage) => usage.total_tokens,
            None => self.estimate_tokens(prompt_text, &completion.content),
        };
        info!(tokens, "buffered solve completed");
        Ok(extract_labeled_answer(&completion.content).with_tokens(tokens))
    }

    fn estimate_tokens(&self, prompt: &str, answer: &str) -> u32 {
        self.estimator.estimate(prompt) + self.estimator.estimate(answer)
    }
}

/// Build the message list for a solve call: image questions attach their
/// images to the instruction text, text questions embed the literal text.
pub(crate) fn build_solve_messages(question: &Question, extra: Option<&str>) -> Vec<ChatMessage> {
    match question {
        Question::Images(images) => vec![ChatMessage::user_with_images(
            PromptTemplate::image_initial(extra),
            images,
        )],
        Question::Text(text) => vec![ChatMessage::user(PromptTemplate::text_initial(text, extra))],
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ports::model_invoker::{Completion, StreamHandle, TokenUsage};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Mock invoker: queued buffered completions plus queued event streams.
    pub struct MockInvoker {
        completions: Mutex<VecDeque<Completion>>,
        streams: Mutex<VecDeque<Vec<Value>>>,
        pub invoke_calls: AtomicUsize,
        pub stream_calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl MockInvoker {
        pub fn new() -> Self {
            Self {
                completions: Mutex::new(VecDeque::new()),
                streams: Mutex::new(VecDeque::new()),
                invoke_calls: AtomicUsize::new(0),
                stream_calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn push_completion(&self, content: &str, tokens: Option<u32>) {
            self.completions.lock().unwrap().push_back(Completion {
                content: content.to_string(),
                usage: tokens.map(|total_tokens| TokenUsage {
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    total_tokens,
                }),
            });
        }

        pub fn push_stream(&self, events: Vec<Value>) {
            self.streams.lock().unwrap().push_back(events);
        }

        pub fn invoke_count(&self) -> usize {
            self.invoke_calls.load(Ordering::SeqCst)
        }

        pub fn stream_count(&self) -> usize {
            self.stream_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelInvoker for MockInvoker {
        async fn invoke(&self, messages: &[ChatMessage]) -> Result<Completion, InvokerError> {
            self.invoke_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push(messages.iter().map(|m| m.text()).collect());
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| InvokerError::Other("no queued completion".to_string()))
        }

        async fn stream_invoke(
            &self,
            messages: &[ChatMessage],
        ) -> Result<StreamHandle, InvokerError> {
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push(messages.iter().map(|m| m.text()).collect());
            let events = self
                .streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| InvokerError::Other("no queued stream".to_string()))?;
            let (tx, rx) = mpsc::channel(events.len().max(1));
            for event in events {
                let _ = tx.try_send(event);
            }
            Ok(StreamHandle::new(rx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockInvoker;
    use super::*;
    use crate::ports::progress::test_support::RecordingSink;
    use crate::ports::token_estimator::BytesPerToken;
    use serde_json::json;

    fn use_case(invoker: Arc<MockInvoker>) -> SolveSingleUseCase {
        SolveSingleUseCase::new(invoker, Arc::new(BytesPerToken))
    }

    #[tokio::test]
    async fn test_streamed_complete_output_no_fallback() {
        let invoker = Arc::new(MockInvoker::new());
        invoker.push_stream(vec![
            json!({"event": "on_chat_model_stream", "content": "题目：2+2\n"}),
            json!({"event": "on_chat_model_stream", "content": "解答：4"}),
            json!({"event": "on_chat_model_end", "output": {"usage": {"total_tokens": 33}}}),
        ]);
        let sink = RecordingSink::new();

        let result = use_case(invoker.clone())
            .execute(SolveSingleInput::new(Question::from("2+2")), &sink)
            .await
            .unwrap();

        assert_eq!(result.question, "2+2");
        assert_eq!(result.answer, "4");
        assert_eq!(result.tokens_used, Some(33));
        assert_eq!(invoker.invoke_count(), 0, "no fallback expected");

        let events = sink.events();
        assert_eq!(events[0], StreamEvent::Start);
        assert!(matches!(events[1], StreamEvent::Delta { .. }));
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_truncated_stream_falls_back_exactly_once() {
        let invoker = Arc::new(MockInvoker::new());
        invoker.push_stream(vec![
            json!({"content": "题目：2+2\n解答：部分"}),
            json!({"event": "end", "output": {"finish_reason": "length"}}),
        ]);
        invoker.push_completion("题目：2+2\n解答：4", Some(50));
        let sink = RecordingSink::new();

        let result = use_case(invoker.clone())
            .execute(SolveSingleInput::new(Question::from("2+2")), &sink)
            .await
            .unwrap();

        // result comes from the fallback, not the partial stream
        assert_eq!(result.answer, "4");
        assert_eq!(result.tokens_used, Some(50));
        assert_eq!(invoker.invoke_count(), 1);
        assert_eq!(invoker.stream_count(), 1);

        // fallback synthesizes a complete event
        let events = sink.events();
        assert!(matches!(
            events.last().unwrap(),
            StreamEvent::Complete { result, .. } if result.answer == "4"
        ));
    }

    #[tokio::test]
    async fn test_missing_label_triggers_fallback() {
        let invoker = Arc::new(MockInvoker::new());
        invoker.push_stream(vec![json!({"content": "garbled output without labels"})]);
        invoker.push_completion("题目：q\n解答：a", None);
        let sink = RecordingSink::new();

        let result = use_case(invoker.clone())
            .execute(SolveSingleInput::new(Question::from("q")), &sink)
            .await
            .unwrap();

        assert_eq!(result.answer, "a");
        assert_eq!(invoker.invoke_count(), 1);
    }

    #[tokio::test]
    async fn test_tokens_estimated_when_usage_absent() {
        let invoker = Arc::new(MockInvoker::new());
        invoker.push_completion("题目：q\n解答：answer", None);
        let sink = RecordingSink::new();

        let result = use_case(invoker)
            .execute(
                SolveSingleInput::new(Question::from("question")).without_streaming(),
                &sink,
            )
            .await
            .unwrap();

        // estimator ran over prompt + answer, nonzero
        assert!(result.tokens_used.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_streamed_invoker_error_emits_error_event() {
        let invoker = Arc::new(MockInvoker::new());
        // no queued stream — stream_invoke fails
        let sink = RecordingSink::new();

        let err = use_case(invoker)
            .execute(SolveSingleInput::new(Question::from("q")), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, SolveError::Failed(_)));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, StreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_buffered_invoker_error_emits_no_events() {
        let invoker = Arc::new(MockInvoker::new());
        // no queued completion — invoke fails
        let sink = RecordingSink::new();

        let err = use_case(invoker)
            .execute(
                SolveSingleInput::new(Question::from("q")).without_streaming(),
                &sink,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SolveError::Failed(_)));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_performs_no_invocations() {
        let invoker = Arc::new(MockInvoker::new());
        let token = CancellationToken::new();
        token.cancel();
        let sink = RecordingSink::new();

        let err = use_case(invoker.clone())
            .execute(
                SolveSingleInput::new(Question::from("q")).with_cancellation(token),
                &sink,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(invoker.invoke_count(), 0);
        assert_eq!(invoker.stream_count(), 0);
        // cancellation is not reported as an error event
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_image_question_builds_image_message() {
        let question = Question::try_images(vec![scholar_domain::ImageAttachment::new(
            vec![0xff],
            "image/jpeg",
        )])
        .unwrap();
        let messages = build_solve_messages(&question, Some("注意单位"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].parts.len(), 2);
        assert!(messages[0].text().contains("注意单位"));
    }
}
