use async_trait::async_trait;
use bytes::Bytes;
use skein_types::ContentAddress;

use crate::error::StoreResult;

/// Capability to store blobs and fetch them back by content address.
///
/// All implementations must satisfy these invariants:
/// - The same content always maps to the same address on one backend.
/// - `upload` may be called several times concurrently for the same
///   content; each call is independent.
/// - `download` returns the stored bytes unmodified. Digest verification
///   is the caller's job.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `content` and return its address.
    ///
    /// `hint` is a digest of `content` the backend may use for
    /// deduplication or logging.
    async fn upload(&self, content: Bytes, hint: &str) -> StoreResult<ContentAddress>;

    /// Fetch the blob at `address`.
    ///
    /// Fails with `NotFound` if absent and `TooLarge` if the blob exceeds
    /// `max_size` bytes.
    async fn download(&self, address: &ContentAddress, max_size: u64) -> StoreResult<Bytes>;
}
