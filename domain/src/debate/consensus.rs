//! Consensus detection over reviewer verdicts.
//!
//! The policy is a trait so the loose substring heuristic can be swapped
//! for a structured verdict (e.g. a JSON `{"approved": bool}`) without
//! touching the debate loop.

/// Decides whether a reviewer verdict signals approval.
pub trait ConsensusPolicy: Send + Sync {
    fn is_approved(&self, verdict: &str) -> bool;
}

/// Case-insensitive `APPROVED` substring match.
///
/// Inherited ambiguity: a verdict like "not approved" still matches. The
/// reviewer prompt instructs the model to reply with the bare keyword on
/// approval, which keeps this reliable in practice; swap the policy rather
/// than patching the heuristic if stricter detection is needed.
#[derive(Debug, Default)]
pub struct SubstringApproval;

impl ConsensusPolicy for SubstringApproval {
    fn is_approved(&self, verdict: &str) -> bool {
        verdict.to_uppercase().contains("APPROVED")
    }
}
