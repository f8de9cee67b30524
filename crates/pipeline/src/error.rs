use aquamine_core::store::StoreError;

/// Failure of one evaluation cycle.
///
/// Only persistence can fail an evaluation. Scoring problems are skipped per
/// parameter and delivery problems are handled by the notification queue.
#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EvaluateError {
    /// Whether the caller may resubmit the same reading.
    pub fn is_retryable(&self) -> bool {
        match self {
            EvaluateError::Store(e) => e.is_retryable(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
