use std::time::Duration;

use skein_types::ContentAddress;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(ContentAddress),

    /// The blob exceeds the caller's size limit.
    #[error("blob {address} is {size} bytes, limit is {limit}")]
    TooLarge {
        address: ContentAddress,
        size: u64,
        limit: u64,
    },

    /// Transport or backend failure during upload.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Redundant upload attempts returned different addresses.
    #[error("redundant uploads disagree: {addresses:?}")]
    Disagreement { addresses: Vec<ContentAddress> },

    /// A single transfer attempt exceeded its time limit.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The dispatcher was built without any backend.
    #[error("no storage backends configured")]
    NoBackends,
}

impl StoreError {
    /// Whether retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UploadFailed(_) | Self::Disagreement { .. } | Self::Timeout { .. }
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
