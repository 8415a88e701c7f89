//! OpenAI-compatible chat-completion adapter.
//!
//! Implements the `ModelInvoker` port against any endpoint speaking the
//! OpenAI chat-completions dialect (DashScope, DeepSeek, vLLM, …).
//! Buffered calls parse `choices[0].message.content` and `usage`; streamed
//! calls parse `data:` SSE lines and forward each chunk's choice record
//! into the event channel unmodified — the stream consumer owns shape
//! tolerance, so provider drift never breaks this adapter.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use scholar_application::{
    ChatMessage, Completion, ContentPart, InvokerError, ModelInvoker, StreamHandle, TokenUsage,
};
use scholar_domain::ModelConfig;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// `ModelInvoker` adapter for OpenAI-compatible endpoints.
///
/// One instance is bound to one resolved [`ModelConfig`]; construct a
/// fresh adapter per request role rather than sharing process-wide
/// client state.
pub struct OpenAiInvoker {
    config: ModelConfig,
    client: reqwest::Client,
}

impl OpenAiInvoker {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, messages: &[ChatMessage], stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.name,
            "temperature": self.config.temperature,
            "messages": messages.iter().map(message_to_json).collect::<Vec<_>>(),
            "stream": stream,
        });
        if let Some(max) = self.config.max_output_tokens {
            body["max_tokens"] = json!(max);
        }
        if stream {
            body["stream_options"] = json!({"include_usage": true});
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, InvokerError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| InvokerError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(InvokerError::RequestFailed(format!(
                "{status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelInvoker for OpenAiInvoker {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<Completion, InvokerError> {
        let body = self.request_body(messages, false);
        debug!(model = %self.config.name, "buffered chat-completion request");

        let payload: Value = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| InvokerError::MalformedPayload(e.to_string()))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(content_text)
            .ok_or_else(|| {
                InvokerError::MalformedPayload("response carries no message content".to_string())
            })?;

        Ok(Completion {
            content,
            usage: usage_of(&payload),
        })
    }

    async fn stream_invoke(&self, messages: &[ChatMessage]) -> Result<StreamHandle, InvokerError> {
        let body = self.request_body(messages, true);
        debug!(model = %self.config.name, "streaming chat-completion request");

        let response = self.post(&body).await?;
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("stream transport error: {e}");
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return;
                    }
                    let Ok(event) = serde_json::from_str::<Value>(data) else {
                        warn!("unparseable SSE payload, skipping");
                        continue;
                    };
                    // Chunks with choices forward the choice record (it
                    // carries delta + finish_reason); usage-only chunks
                    // forward whole.
                    let forwarded = match event.pointer("/choices/0") {
                        Some(choice) => choice.clone(),
                        None => event,
                    };
                    if tx.send(forwarded).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(StreamHandle::new(rx))
    }
}

fn message_to_json(message: &ChatMessage) -> Value {
    let role = match message.role {
        scholar_application::Role::System => "system",
        scholar_application::Role::User => "user",
        scholar_application::Role::Assistant => "assistant",
    };

    // Text-only messages use plain string content; multimodal messages
    // use the content-parts array with base64 data URLs.
    let text_only = message
        .parts
        .iter()
        .all(|p| matches!(p, ContentPart::Text(_)));

    let content = if text_only {
        json!(message.text())
    } else {
        let parts: Vec<Value> = message
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({"type": "text", "text": text}),
                ContentPart::Image(image) => {
                    let url = format!(
                        "data:{};base64,{}",
                        image.mime,
                        BASE64.encode(&image.data)
                    );
                    json!({"type": "image_url", "image_url": {"url": url}})
                }
            })
            .collect();
        json!(parts)
    };

    json!({"role": role, "content": content})
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect(),
        ),
        _ => None,
    }
}

fn usage_of(payload: &Value) -> Option<TokenUsage> {
    let usage = payload.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: usage.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: usage.get("total_tokens")?.as_u64()? as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_domain::ImageAttachment;

    fn config() -> ModelConfig {
        ModelConfig::new("qwen-vl-max", "sk-test", "https://api.example.com/v1/")
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let invoker = OpenAiInvoker::new(config());
        assert_eq!(
            invoker.endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let invoker = OpenAiInvoker::new(config().with_max_output_tokens(2048));
        let body = invoker.request_body(&[ChatMessage::user("2+2")], false);
        assert_eq!(body["model"], "qwen-vl-max");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "2+2");
    }

    #[test]
    fn test_stream_body_requests_usage() {
        let invoker = OpenAiInvoker::new(config());
        let body = invoker.request_body(&[ChatMessage::user("q")], true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn test_image_message_uses_data_url_parts() {
        let image = ImageAttachment::new(vec![0xff, 0xd8, 0xff], "image/jpeg");
        let message = ChatMessage::user_with_images("识别题目", &[image]);
        let value = message_to_json(&message);

        let parts = value["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_usage_parsing() {
        let payload = json!({
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        });
        let usage = usage_of(&payload).unwrap();
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn test_content_text_from_parts() {
        let content = json!([{"type": "text", "text": "解答"}, {"type": "text", "text": "：4"}]);
        assert_eq!(content_text(&content).unwrap(), "解答：4");
    }
}
