//! Outbound progress events.
//!
//! [`StreamEvent`] is the wire contract toward the caller. Consumers
//! serialize these however they deliver progress (a console renderer, or
//! Server-Sent-Events `data: <json>\n\n` frames); this crate only fixes
//! the JSON shape. The `model1`/`model2` tags identify the proposer and
//! reviewer of a debate run.

use super::result::SolveResult;
use serde::Serialize;

/// One progress event emitted during a solve or debate run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Generation started.
    Start,
    /// A text chunk from the model.
    Delta { value: String },
    /// The run finished; carries the full text and the structured result.
    Complete { value: String, result: SolveResult },
    /// The run failed.
    Error { message: String },
    /// A debate phase transition ("proposer generating…").
    Status { message: String, iteration: u32 },
    /// The proposer's answer for one round (1-based round number).
    Model1 { content: String, iteration: u32 },
    /// The reviewer's verdict for one round (1-based round number).
    Model2 { content: String, iteration: u32 },
}

impl StreamEvent {
    pub fn delta(value: impl Into<String>) -> Self {
        Self::Delta {
            value: value.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn status(message: impl Into<String>, iteration: u32) -> Self {
        Self::Status {
            message: message.into(),
            iteration,
        }
    }

    /// Returns the text content if this is a Delta or Complete event.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Delta { value } | Self::Complete { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_text_returns_content() {
        let event = StreamEvent::delta("hello");
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn complete_is_terminal() {
        let event = StreamEvent::Complete {
            value: "full".to_string(),
            result: SolveResult::new("q", "a"),
        };
        assert_eq!(event.text(), Some("full"));
        assert!(event.is_terminal());
    }

    #[test]
    fn error_is_terminal_without_text() {
        let event = StreamEvent::error("oops");
        assert_eq!(event.text(), None);
        assert!(event.is_terminal());
    }

    #[test]
    fn wire_tags_match_contract() {
        let json = serde_json::to_value(StreamEvent::Start).unwrap();
        assert_eq!(json["type"], "start");

        let json = serde_json::to_value(StreamEvent::Model1 {
            content: "answer".to_string(),
            iteration: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "model1");
        assert_eq!(json["iteration"], 1);

        let json = serde_json::to_value(StreamEvent::Model2 {
            content: "verdict".to_string(),
            iteration: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "model2");

        let json = serde_json::to_value(StreamEvent::status("reviewing", 2)).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["message"], "reviewing");
    }
}
