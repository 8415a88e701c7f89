//! Domain error types

use thiserror::Error;

/// Validation errors for domain value objects
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_question_display() {
        let error = DomainError::InvalidQuestion("text is empty".to_string());
        assert_eq!(error.to_string(), "Invalid question: text is empty");
    }
}
