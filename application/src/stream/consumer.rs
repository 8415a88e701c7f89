//! Stream protocol consumer.
//!
//! Providers emit event records whose shape is inherently unstable:
//! different event names (`on_chat_model_stream`, `on_llm_new_token`,
//! `on_chat_model_end`, …) and different nesting of the delta payload.
//! [`consume_stream`] reduces any such stream to one accumulated string
//! plus metadata, using a small ordered table of named extractor
//! strategies — tolerating a new provider quirk is a one-line addition.
//!
//! The function is pure with respect to its inputs except for the
//! per-delta callback, which is the only side effect visible to the
//! caller during consumption.

use crate::ports::model_invoker::{InvokerError, StreamHandle};
use serde_json::Value;
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

/// The consumer's output for one streamed call. Transient: built once per
/// call and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedStream {
    /// Accumulated text (end-of-stream text wins when strictly longer).
    pub content: String,
    /// Provider-reported finish reason, if any event carried one.
    pub finish_reason: Option<String>,
    /// Provider-reported total tokens, best-effort.
    pub tokens_used: Option<u32>,
    /// Number of events that yielded a nonempty delta.
    pub delta_count: usize,
    /// Logical event names seen, for diagnostics only.
    pub observed_event_names: BTreeSet<String>,
}

type DeltaExtractor = (&'static str, fn(&Value) -> Option<String>);

/// Ordered delta extraction strategies; the first nonempty match wins.
const DELTA_EXTRACTORS: &[DeltaExtractor] = &[
    ("raw", |v| v.as_str().map(str::to_string)),
    ("text", |v| {
        v.get("text").and_then(Value::as_str).map(str::to_string)
    }),
    ("content", |v| v.get("content").and_then(content_to_text)),
    ("message.content", |v| {
        v.pointer("/message/content").and_then(content_to_text)
    }),
    ("delta.content", |v| {
        v.pointer("/delta/content").and_then(content_to_text)
    }),
    ("chunk", |v| v.get("chunk").and_then(wrapped_text)),
    ("token", |v| v.get("token").and_then(wrapped_text)),
];

/// Field names under which providers deliver the end-of-generation payload.
const END_PAYLOAD_KEYS: &[&str] = &["output", "response", "result"];

/// Normalize a `content` field: plain string or array-of-parts.
fn content_to_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|part| {
                    part.as_str()
                        .or_else(|| part.get("text").and_then(Value::as_str))
                })
                .collect();
            Some(text)
        }
        _ => None,
    }
}

/// Unwrap one level of `chunk`/`token` nesting.
fn wrapped_text(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::to_string)
        .or_else(|| v.get("text").and_then(Value::as_str).map(str::to_string))
        .or_else(|| v.get("content").and_then(content_to_text))
        .or_else(|| v.pointer("/message/content").and_then(content_to_text))
}

/// Determine an event's logical name defensively.
fn event_name(event: &Value) -> &str {
    event
        .get("event")
        .or_else(|| event.get("name"))
        .or_else(|| event.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Extract a delta using the strategy table; empty matches don't count.
fn extract_delta(event: &Value) -> Option<String> {
    for (_, extractor) in DELTA_EXTRACTORS {
        if let Some(text) = extractor(event)
            && !text.is_empty()
        {
            return Some(text);
        }
    }
    None
}

/// Final text from an end-of-generation payload, longest candidate wins.
fn final_text(payload: &Value) -> Option<String> {
    let candidates = [
        payload.as_str().map(str::to_string),
        payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string),
        payload.get("content").and_then(content_to_text),
        payload.pointer("/message/content").and_then(content_to_text),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter(|t| !t.is_empty())
        .max_by_key(String::len)
}

fn finish_reason_of(payload: &Value) -> Option<String> {
    payload
        .get("finish_reason")
        .or_else(|| payload.pointer("/response_metadata/finish_reason"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn tokens_of(payload: &Value) -> Option<u32> {
    ["/usage/total_tokens", "/usage_metadata/total_tokens", "/token_usage/total_tokens"]
        .into_iter()
        .find_map(|p| payload.pointer(p))
        .and_then(Value::as_u64)
        .map(|t| t as u32)
}

/// Consume a heterogeneous provider event stream.
///
/// For each event: record its logical name, append any delta (invoking
/// `on_delta` — the only suspension-visible side effect), and track
/// end-of-generation text, finish reason, and token usage. End-of-stream
/// text is authoritative: it replaces the accumulated delta text when
/// strictly longer (guards against providers that stream partial deltas
/// but also emit a complete final block).
///
/// Cancellation is cooperative: an already-triggered token stops
/// consumption with [`InvokerError::Cancelled`] at the next loop
/// iteration.
pub async fn consume_stream(
    mut handle: StreamHandle,
    mut on_delta: impl FnMut(&str),
    cancel: &Option<CancellationToken>,
) -> Result<ConsumedStream, InvokerError> {
    let mut content = String::new();
    let mut end_text: Option<String> = None;
    let mut finish_reason = None;
    let mut tokens_used = None;
    let mut delta_count = 0usize;
    let mut observed_event_names = BTreeSet::new();

    while let Some(event) = handle.receiver.recv().await {
        if let Some(token) = cancel
            && token.is_cancelled()
        {
            return Err(InvokerError::Cancelled);
        }

        observed_event_names.insert(event_name(&event).to_string());

        if let Some(delta) = extract_delta(&event) {
            content.push_str(&delta);
            delta_count += 1;
            on_delta(&delta);
        }

        for key in END_PAYLOAD_KEYS {
            if let Some(payload) = event.get(key) {
                if let Some(text) = final_text(payload) {
                    match &end_text {
                        Some(prev) if prev.len() >= text.len() => {}
                        _ => end_text = Some(text),
                    }
                }
                if finish_reason.is_none() {
                    finish_reason = finish_reason_of(payload);
                }
                if tokens_used.is_none() {
                    tokens_used = tokens_of(payload);
                }
            }
        }

        // finish reason / usage may also ride at the event's top level
        if finish_reason.is_none() {
            finish_reason = finish_reason_of(&event);
        }
        if tokens_used.is_none() {
            tokens_used = tokens_of(&event);
        }
    }

    if let Some(text) = end_text
        && text.len() > content.len()
    {
        content = text;
    }

    Ok(ConsumedStream {
        content,
        finish_reason,
        tokens_used,
        delta_count,
        observed_event_names,
    })
}
