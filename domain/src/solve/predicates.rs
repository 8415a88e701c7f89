//! Completeness predicates for streamed model output.
//!
//! Truncation shows up through three unrelated signals: blank output, a
//! missing `解答:` label, and a provider-reported `length` finish reason.
//! They are kept as separate named predicates — the single-pass solver
//! combines them via [`is_incomplete_output`], but callers and tests can
//! exercise each one independently.

use super::result::extract_labeled_answer;

/// Output is empty or whitespace only.
pub fn is_blank_output(text: &str) -> bool {
    text.trim().is_empty()
}

/// The `解答:` answer label is absent (full-width or ASCII colon).
///
/// Every solve prompt instructs the model to emit this label, so its
/// absence signals a malformed or truncated response.
pub fn missing_answer_label(text: &str) -> bool {
    !text.contains("解答：") && !text.contains("解答:")
}

/// The provider reported `length` — generation hit the output token cap.
pub fn finish_reason_is_length(finish_reason: Option<&str>) -> bool {
    finish_reason == Some("length")
}

/// Label extraction yields an empty answer.
pub fn extracted_answer_is_blank(text: &str) -> bool {
    extract_labeled_answer(text).answer.trim().is_empty()
}

/// Combined completeness check used by the single-pass solver: any one
/// signal marks the streamed output as unusable and triggers the
/// non-streaming fallback.
pub fn is_incomplete_output(text: &str, finish_reason: Option<&str>) -> bool {
    is_blank_output(text)
        || missing_answer_label(text)
        || finish_reason_is_length(finish_reason)
        || extracted_answer_is_blank(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_output() {
        assert!(is_blank_output(""));
        assert!(is_blank_output("  \n\t"));
        assert!(!is_blank_output("解答：4"));
    }

    #[test]
    fn test_missing_answer_label() {
        assert!(missing_answer_label("The answer is 4"));
        assert!(!missing_answer_label("解答：4"));
        assert!(!missing_answer_label("解答: 4"));
    }

    #[test]
    fn test_finish_reason_length() {
        assert!(finish_reason_is_length(Some("length")));
        assert!(!finish_reason_is_length(Some("stop")));
        assert!(!finish_reason_is_length(None));
    }

    #[test]
    fn test_extracted_answer_blank() {
        assert!(extracted_answer_is_blank("题目：2+2\n解答："));
        assert!(!extracted_answer_is_blank("题目：2+2\n解答：4"));
    }

    #[test]
    fn test_combined_any_signal_triggers() {
        // complete output
        assert!(!is_incomplete_output("题目：2+2\n解答：4", Some("stop")));
        // each signal independently
        assert!(is_incomplete_output("", Some("stop")));
        assert!(is_incomplete_output("no label here", Some("stop")));
        assert!(is_incomplete_output("题目：2+2\n解答：4", Some("length")));
        assert!(is_incomplete_output("解答：", Some("stop")));
    }
}
