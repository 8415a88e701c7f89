//! Structured result extraction from free-form model output.
//!
//! Models are instructed to emit a `题目:` (question) / `解答:` (answer)
//! labelled block. [`extract_labeled_answer`] pulls that block apart; when
//! the labels are absent it degrades gracefully instead of failing — the
//! whole text becomes the answer and the question is marked unrecognized.
//! This is pure domain logic: no I/O, just text pattern matching.

use serde::{Deserialize, Serialize};

/// Placeholder question when the model output carries no `题目:` label.
pub const UNRECOGNIZED_QUESTION: &str = "未识别到题目";

/// The structured outcome of one solve run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// The question as restated by the model, or [`UNRECOGNIZED_QUESTION`].
    pub question: String,
    /// The answer text.
    pub answer: String,
    /// Total tokens consumed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

impl SolveResult {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// The structured outcome of one follow-up run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpResult {
    /// The follow-up answer text.
    pub answer: String,
    /// Total tokens consumed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

impl FollowUpResult {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            tokens_used: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// Locate a label written with either a full-width or an ASCII colon.
///
/// Returns `(label_start, content_start)` for the first occurrence.
fn find_label(text: &str, label: &str) -> Option<(usize, usize)> {
    for colon in ["：", ":"] {
        let needle = format!("{label}{colon}");
        if let Some(idx) = text.find(&needle) {
            return Some((idx, idx + needle.len()));
        }
    }
    None
}

/// Extract a `题目:` / `解答:` labelled block from model output.
///
/// - Both labels present: the text between them is the question, the text
///   after `解答:` is the answer.
/// - Only `解答:` present: question is [`UNRECOGNIZED_QUESTION`].
/// - No `解答:` label: the entire (trimmed) text is the answer and the
///   question is [`UNRECOGNIZED_QUESTION`]. This is not an error.
pub fn extract_labeled_answer(text: &str) -> SolveResult {
    let Some((answer_label_start, answer_start)) = find_label(text, "解答") else {
        return SolveResult::new(UNRECOGNIZED_QUESTION, text.trim());
    };

    let answer = text[answer_start..].trim();

    let question = match find_label(&text[..answer_label_start], "题目") {
        Some((_, question_start)) => {
            let q = text[question_start..answer_label_start].trim();
            if q.is_empty() {
                UNRECOGNIZED_QUESTION
            } else {
                q
            }
        }
        None => UNRECOGNIZED_QUESTION,
    };

    SolveResult::new(question, answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_full_width_labels() {
        let result = extract_labeled_answer("题目：2+2\n\n解答：4");
        assert_eq!(result.question, "2+2");
        assert_eq!(result.answer, "4");
    }

    #[test]
    fn test_extract_ascii_labels() {
        let result = extract_labeled_answer("题目: 求导 f(x)=x^2\n解答: f'(x)=2x");
        assert_eq!(result.question, "求导 f(x)=x^2");
        assert_eq!(result.answer, "f'(x)=2x");
    }

    #[test]
    fn test_no_labels_degrades_to_raw_answer() {
        let result = extract_labeled_answer("The answer is 4.");
        assert_eq!(result.question, UNRECOGNIZED_QUESTION);
        assert_eq!(result.answer, "The answer is 4.");
    }

    #[test]
    fn test_answer_label_without_question_label() {
        let result = extract_labeled_answer("解答：x = 3");
        assert_eq!(result.question, UNRECOGNIZED_QUESTION);
        assert_eq!(result.answer, "x = 3");
    }

    #[test]
    fn test_blank_question_between_labels() {
        let result = extract_labeled_answer("题目：  \n解答：done");
        assert_eq!(result.question, UNRECOGNIZED_QUESTION);
        assert_eq!(result.answer, "done");
    }

    #[test]
    fn test_multiline_answer_preserved() {
        let text = "题目：解方程 x^2 = 9\n\n解答：两边开方，\nx = 3 或 x = -3";
        let result = extract_labeled_answer(text);
        assert_eq!(result.question, "解方程 x^2 = 9");
        assert!(result.answer.contains("x = 3 或 x = -3"));
    }

    #[test]
    fn test_with_tokens_builder() {
        let result = SolveResult::new("q", "a").with_tokens(120);
        assert_eq!(result.tokens_used, Some(120));
    }
}
