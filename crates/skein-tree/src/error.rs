//! Error types for the index tree.

use skein_crypto::DigestError;
use skein_store::StoreError;
use skein_types::{ContentAddress, TypeError};

/// Errors that can occur while resolving or building the tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// No reachable node covers `offset` on `axis`.
    #[error("{axis} {offset} out of range")]
    OutOfRange { axis: String, offset: f64 },

    /// The offset lands inside a node's span on an axis other than `bytes`.
    #[error("{axis} {offset} is within a chunk span")]
    AmbiguousOffset { axis: String, offset: f64 },

    /// A `bytes` offset that is not a whole byte position.
    #[error("bytes offset {offset} is not a whole byte")]
    FractionalOffset { offset: f64 },

    /// A node document failed verification or could not be decoded.
    #[error("corrupt node {address}: {reason}")]
    CorruptNode {
        address: ContentAddress,
        reason: String,
    },

    /// Payload bytes failed digest verification.
    #[error("payload {address} failed verification: {source}")]
    Digest {
        address: ContentAddress,
        #[source]
        source: DigestError,
    },

    /// Two same-target entries were merged across a gap on `bytes`.
    #[error("lookup entries not contiguous on bytes: {end} != {start}")]
    Discontiguous { end: f64, start: f64 },

    /// A reference has digests but no address to fetch it from.
    #[error("identifiers carry no content address")]
    Unaddressed,

    /// Zero-length payloads are not written.
    #[error("empty write")]
    EmptyWrite,

    /// Malformed spans (missing or reserved axis).
    #[error(transparent)]
    Span(#[from] TypeError),

    /// Content store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization failure while encoding a node document.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TreeError {
    /// Whether the caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OutOfRange { .. } => true,
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
