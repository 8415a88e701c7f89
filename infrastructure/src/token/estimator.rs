//! Heuristic token estimator.
//!
//! Used only when provider-reported usage is absent. CJK text tokenizes
//! close to one token per character; Latin text close to one token per
//! four characters. Accuracy is best-effort — the estimate feeds display
//! and bookkeeping, never billing.

use scholar_application::TokenEstimator;

/// Character-class token estimate: CJK counts 1 per char, everything else
/// 1 per 4 chars (rounded up).
pub struct HeuristicEstimator;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // Extension A
        | '\u{3000}'..='\u{303F}' // CJK punctuation
        | '\u{FF00}'..='\u{FFEF}' // full-width forms
    )
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> u32 {
        let mut cjk = 0u32;
        let mut other = 0u32;
        for c in text.chars() {
            if is_cjk(c) {
                cjk += 1;
            } else {
                other += 1;
            }
        }
        cjk + other.div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(HeuristicEstimator.estimate(""), 0);
    }

    #[test]
    fn test_ascii_quarters() {
        assert_eq!(HeuristicEstimator.estimate("abcdefgh"), 2);
        assert_eq!(HeuristicEstimator.estimate("abc"), 1);
    }

    #[test]
    fn test_cjk_counts_per_char() {
        assert_eq!(HeuristicEstimator.estimate("解方程"), 3);
    }

    #[test]
    fn test_mixed_text() {
        // 4 CJK chars + 8 ASCII chars -> 4 + 2
        assert_eq!(HeuristicEstimator.estimate("解答如下abcdefgh"), 6);
    }
}
