use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use skein_types::ContentAddress;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Blobs are addressed by the BLAKE3 hex digest of their content, so
/// redundant uploads of the same bytes converge on one address. Intended
/// for tests and embedding; it also carries fault-injection hooks for
/// exercising integrity and commit-failure paths.
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentAddress, Bytes>>,
    uploads: AtomicU64,
    failing_uploads: AtomicU64,
    divergent: AtomicBool,
    latency_micros: AtomicU64,
}

impl InMemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            uploads: AtomicU64::new(0),
            failing_uploads: AtomicU64::new(0),
            divergent: AtomicBool::new(false),
            latency_micros: AtomicU64::new(0),
        }
    }

    /// A store that sleeps for `latency` before every transfer.
    pub fn with_latency(latency: Duration) -> Self {
        let store = Self::new();
        store.set_latency(latency);
        store
    }

    /// Change the delay applied before every transfer. Zero disables it.
    pub fn set_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.store(micros, Ordering::SeqCst);
    }

    pub fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_micros.load(Ordering::SeqCst))
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|blob| blob.len() as u64)
            .sum()
    }

    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.blobs
            .read()
            .expect("lock poisoned")
            .contains_key(address)
    }

    /// Number of upload calls received, including failed ones.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Make the next `count` uploads fail with `UploadFailed`.
    pub fn fail_next_uploads(&self, count: u64) {
        self.failing_uploads.store(count, Ordering::SeqCst);
    }

    /// When set, every upload returns a distinct address, as two
    /// inconsistent mirrors would.
    pub fn set_divergent(&self, divergent: bool) {
        self.divergent.store(divergent, Ordering::SeqCst);
    }

    /// Overwrite the blob at `address` in place. Returns `false` if absent.
    pub fn tamper(&self, address: &ContentAddress, content: impl Into<Bytes>) -> bool {
        let mut blobs = self.blobs.write().expect("lock poisoned");
        match blobs.get_mut(address) {
            Some(blob) => {
                *blob = content.into();
                true
            }
            None => false,
        }
    }

    /// Remove a blob. Returns `true` if it existed.
    pub fn remove(&self, address: &ContentAddress) -> bool {
        self.blobs
            .write()
            .expect("lock poisoned")
            .remove(address)
            .is_some()
    }

    /// Remove all blobs from the store.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }

    fn take_failure(&self) -> bool {
        self.failing_uploads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn simulate_latency(&self) {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(&self, content: Bytes, hint: &str) -> StoreResult<ContentAddress> {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.take_failure() {
            return Err(StoreError::UploadFailed(format!(
                "injected failure on upload {attempt}"
            )));
        }

        let digest = blake3::hash(&content).to_hex();
        let address = if self.divergent.load(Ordering::SeqCst) {
            ContentAddress::new(format!("{digest}-{attempt}"))
        } else {
            ContentAddress::new(digest.as_str())
        };

        debug!(address = address.short(), size = content.len(), hint_len = hint.len(), "stored blob");
        self.blobs
            .write()
            .expect("lock poisoned")
            .entry(address.clone())
            .or_insert(content);
        Ok(address)
    }

    async fn download(&self, address: &ContentAddress, max_size: u64) -> StoreResult<Bytes> {
        self.simulate_latency().await;
        let blob = self
            .blobs
            .read()
            .expect("lock poisoned")
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.clone()))?;
        let size = blob.len() as u64;
        if size > max_size {
            return Err(StoreError::TooLarge {
                address: address.clone(),
                size,
                limit: max_size,
            });
        }
        Ok(blob)
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &self.len())
            .field("latency", &self.latency())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_and_download() {
        let store = InMemoryContentStore::new();
        let address = store.upload(Bytes::from_static(b"hello"), "h").await.unwrap();
        let back = store.download(&address, 1024).await.unwrap();
        assert_eq!(&back[..], b"hello");
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 5);
    }

    #[tokio::test]
    async fn same_content_same_address() {
        let store = InMemoryContentStore::new();
        let a = store.upload(Bytes::from_static(b"x"), "").await.unwrap();
        let b = store.upload(Bytes::from_static(b"x"), "").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.upload_count(), 2);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = InMemoryContentStore::new();
        let err = store
            .download(&ContentAddress::new("nope"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn oversized_blob_is_rejected() {
        let store = InMemoryContentStore::new();
        let address = store.upload(Bytes::from(vec![0u8; 100]), "").await.unwrap();
        let err = store.download(&address, 99).await.unwrap_err();
        assert!(matches!(err, StoreError::TooLarge { size: 100, limit: 99, .. }));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemoryContentStore::new();
        store.fail_next_uploads(1);
        assert!(store.upload(Bytes::from_static(b"a"), "").await.is_err());
        assert!(store.upload(Bytes::from_static(b"a"), "").await.is_ok());
    }

    #[tokio::test]
    async fn divergent_uploads_differ() {
        let store = InMemoryContentStore::new();
        store.set_divergent(true);
        let a = store.upload(Bytes::from_static(b"a"), "").await.unwrap();
        let b = store.upload(Bytes::from_static(b"a"), "").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn tamper_replaces_content() {
        let store = InMemoryContentStore::new();
        let address = store.upload(Bytes::from_static(b"good"), "").await.unwrap();
        assert!(store.tamper(&address, &b"evil"[..]));
        assert_eq!(&store.download(&address, 10).await.unwrap()[..], b"evil");
        assert!(!store.tamper(&ContentAddress::new("absent"), &b""[..]));
    }

    #[tokio::test]
    async fn latency_can_be_switched_on_and_off() {
        let store = InMemoryContentStore::new();
        assert!(store.latency().is_zero());
        store.set_latency(Duration::from_millis(30));
        assert_eq!(store.latency(), Duration::from_millis(30));
        let started = std::time::Instant::now();
        store.upload(Bytes::from_static(b"slow"), "").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
        store.set_latency(Duration::ZERO);
        assert!(store.latency().is_zero());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let store = InMemoryContentStore::new();
        let address = store.upload(Bytes::from_static(b"a"), "").await.unwrap();
        store.upload(Bytes::from_static(b"b"), "").await.unwrap();
        assert!(store.remove(&address));
        assert!(!store.contains(&address));
        store.clear();
        assert!(store.is_empty());
    }
}
