/// Errors from digest verification.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// A recorded digest disagrees with the digest of the received bytes.
    #[error("{algorithm} digest mismatch: expected {expected}, computed {computed}")]
    Mismatch {
        algorithm: String,
        expected: String,
        computed: String,
    },

    /// None of the recorded digests use an algorithm this provider computes.
    #[error("no digest to verify against (recorded: {known:?})")]
    Unverifiable { known: Vec<String> },
}

/// Result alias for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;
