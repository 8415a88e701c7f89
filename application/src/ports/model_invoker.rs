//! Model Invoker port
//!
//! Defines the interface for one chat-completion capability. The invoker
//! performs no retries and holds no state — failures propagate as
//! [`InvokerError`] and the caller decides what to do with them.
//!
//! Streamed events are raw `serde_json::Value` records because provider
//! event shapes are unstable; the stream consumer normalizes them.

use async_trait::async_trait;
use scholar_domain::ImageAttachment;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during model invocation
#[derive(Error, Debug)]
pub enum InvokerError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Provider rejected request: {0}")]
    RequestFailed(String),

    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

impl InvokerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvokerError::Cancelled)
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One part of a message: text or an embedded image.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(ImageAttachment),
}

/// One message in a chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// A user message carrying text plus attached images.
    pub fn user_with_images(text: impl Into<String>, images: &[ImageAttachment]) -> Self {
        let mut parts = vec![ContentPart::Text(text.into())];
        parts.extend(images.iter().cloned().map(ContentPart::Image));
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Concatenated text parts (images contribute nothing).
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect()
    }
}

/// Provider-reported token usage for a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completed (non-streamed) model response.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Handle for receiving streamed provider events.
///
/// Wraps an `mpsc::Receiver` of raw JSON event records. The channel closes
/// when generation ends or the transport drops.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<serde_json::Value>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<serde_json::Value>) -> Self {
        Self { receiver }
    }
}

/// One chat-completion capability behind a resolved model configuration.
///
/// Implementations (adapters) live in the infrastructure layer. A single
/// invoker instance is bound to one model endpoint; the orchestrators hold
/// one per debate role.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send messages and wait for the complete response.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<Completion, InvokerError>;

    /// Send messages and receive incremental generation events.
    ///
    /// Default implementation calls `invoke()` and emits one synthetic
    /// terminal event, so non-streaming adapters work without changes.
    async fn stream_invoke(&self, messages: &[ChatMessage]) -> Result<StreamHandle, InvokerError> {
        let completion = self.invoke(messages).await?;
        let (tx, rx) = mpsc::channel(1);
        let mut event = serde_json::json!({
            "event": "on_chat_model_end",
            "output": { "content": completion.content },
        });
        if let Some(usage) = completion.usage {
            event["output"]["usage"] = serde_json::json!({
                "total_tokens": usage.total_tokens,
            });
        }
        // If the receiver is dropped, that's fine
        let _ = tx.send(event).await;
        Ok(StreamHandle::new(rx))
    }
}
