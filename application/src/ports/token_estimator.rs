//! Token estimator port
//!
//! Used only when provider-reported usage is absent. The estimate must be
//! non-negative; beyond that, accuracy is best-effort.

/// Estimates the token count of a piece of text.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> u32;
}

/// Fixed-ratio estimator for tests: one token per four bytes.
pub struct BytesPerToken;

impl TokenEstimator for BytesPerToken {
    fn estimate(&self, text: &str) -> u32 {
        (text.len() / 4) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_token() {
        assert_eq!(BytesPerToken.estimate(""), 0);
        assert_eq!(BytesPerToken.estimate("abcdefgh"), 2);
    }
}
