//! Shared utilities for use cases.
//!
//! Cancellation checking used by all orchestrators. Cancellation is
//! cooperative: the token is checked at defined suspension points (top of
//! each half-round, each stream-chunk read), never preemptively.

use crate::use_cases::solve_single::SolveError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(SolveError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), SolveError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(SolveError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_token_passes() {
        assert!(check_cancelled(&None).is_ok());
    }

    #[test]
    fn test_untriggered_token_passes() {
        let token = CancellationToken::new();
        assert!(check_cancelled(&Some(token)).is_ok());
    }

    #[test]
    fn test_triggered_token_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let err = check_cancelled(&Some(token)).unwrap_err();
        assert!(matches!(err, SolveError::Cancelled));
    }
}
