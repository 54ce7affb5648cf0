//! Redundant upload and mirror failover over an ordered list of backends.
//!
//! [`Dispatcher`] is itself a [`ContentStore`], so the stream engine never
//! needs to know how many backends sit behind it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use skein_types::ContentAddress;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// Configuration for the [`Dispatcher`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of concurrent upload attempts per blob.
    pub redundancy: usize,
    /// Time limit for each single upload or download attempt.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            redundancy: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Fans uploads out to redundant attempts and downloads across mirrors.
///
/// Upload policy: attempt `i` goes to backend `i % backends.len()`. The
/// dispatcher waits for every attempt; all must succeed and all must return
/// the same address. A disagreement is reported, never resolved by picking
/// one of the answers.
///
/// Download policy: backends are tried in order; the first success wins.
pub struct Dispatcher {
    backends: Vec<Arc<dyn ContentStore>>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over an ordered, non-empty list of backends.
    pub fn new(backends: Vec<Arc<dyn ContentStore>>, config: DispatchConfig) -> StoreResult<Self> {
        if backends.is_empty() {
            return Err(StoreError::NoBackends);
        }
        Ok(Self { backends, config })
    }

    /// Dispatcher over a single backend.
    pub fn single(backend: Arc<dyn ContentStore>, config: DispatchConfig) -> Self {
        Self {
            backends: vec![backend],
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

#[async_trait]
impl ContentStore for Dispatcher {
    async fn upload(&self, content: Bytes, hint: &str) -> StoreResult<ContentAddress> {
        let limit = self.config.timeout;
        let mut attempts = JoinSet::new();
        for attempt in 0..self.config.redundancy.max(1) {
            let backend = Arc::clone(&self.backends[attempt % self.backends.len()]);
            let content = content.clone();
            let hint = hint.to_owned();
            attempts.spawn(async move {
                match timeout(limit, backend.upload(content, &hint)).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout {
                        operation: "upload",
                        after: limit,
                    }),
                }
            });
        }

        let mut addresses: Vec<ContentAddress> = Vec::new();
        let mut failure: Option<StoreError> = None;
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok(Ok(address)) => addresses.push(address),
                Ok(Err(err)) => {
                    warn!(error = %err, "upload attempt failed");
                    failure.get_or_insert(err);
                }
                Err(join) => {
                    warn!(error = %join, "upload attempt aborted");
                    failure.get_or_insert(StoreError::UploadFailed(join.to_string()));
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }

        addresses.sort();
        addresses.dedup();
        match addresses.len() {
            1 => {
                let address = addresses.remove(0);
                debug!(address = address.short(), attempts = self.config.redundancy, "redundant upload converged");
                Ok(address)
            }
            0 => Err(StoreError::UploadFailed("no upload attempt completed".into())),
            _ => {
                warn!(?addresses, "redundant uploads disagree");
                Err(StoreError::Disagreement { addresses })
            }
        }
    }

    async fn download(&self, address: &ContentAddress, max_size: u64) -> StoreResult<Bytes> {
        let limit = self.config.timeout;
        let mut last_error = StoreError::NoBackends;
        for (mirror, backend) in self.backends.iter().enumerate() {
            let result = match timeout(limit, backend.download(address, max_size)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    operation: "download",
                    after: limit,
                }),
            };
            match result {
                Ok(blob) => return Ok(blob),
                Err(err @ StoreError::TooLarge { .. }) => return Err(err),
                Err(err) => {
                    warn!(mirror, address = address.short(), error = %err, "download failed, trying next mirror");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backends", &self.backends.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryContentStore;

    fn config(redundancy: usize) -> DispatchConfig {
        DispatchConfig {
            redundancy,
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn empty_backend_list_is_rejected() {
        assert!(matches!(
            Dispatcher::new(Vec::new(), DispatchConfig::default()),
            Err(StoreError::NoBackends)
        ));
    }

    #[tokio::test]
    async fn redundant_upload_converges() {
        let store = Arc::new(InMemoryContentStore::new());
        let dispatcher = Dispatcher::single(store.clone(), config(2));
        let address = dispatcher.upload(Bytes::from_static(b"doc"), "h").await.unwrap();
        assert_eq!(store.upload_count(), 2);
        assert_eq!(&dispatcher.download(&address, 10).await.unwrap()[..], b"doc");
    }

    #[tokio::test]
    async fn diverging_attempts_are_rejected() {
        let store = Arc::new(InMemoryContentStore::new());
        store.set_divergent(true);
        let dispatcher = Dispatcher::single(store, config(2));
        let err = dispatcher.upload(Bytes::from_static(b"doc"), "h").await.unwrap_err();
        match err {
            StoreError::Disagreement { addresses } => assert_eq!(addresses.len(), 2),
            other => panic!("expected disagreement, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn one_failed_attempt_fails_the_upload() {
        let store = Arc::new(InMemoryContentStore::new());
        store.fail_next_uploads(1);
        let dispatcher = Dispatcher::single(store.clone(), config(2));
        let err = dispatcher.upload(Bytes::from_static(b"doc"), "h").await.unwrap_err();
        assert!(matches!(err, StoreError::UploadFailed(_)));
        assert!(err.is_retryable());
        // both attempts ran to completion
        assert_eq!(store.upload_count(), 2);
    }

    #[tokio::test]
    async fn uploads_spread_across_backends() {
        let a = Arc::new(InMemoryContentStore::new());
        let b = Arc::new(InMemoryContentStore::new());
        let dispatcher = Dispatcher::new(vec![a.clone() as Arc<dyn ContentStore>, b.clone() as Arc<dyn ContentStore>], config(2)).unwrap();
        let address = dispatcher.upload(Bytes::from_static(b"doc"), "h").await.unwrap();
        assert!(a.contains(&address));
        assert!(b.contains(&address));
    }

    #[tokio::test]
    async fn download_fails_over_to_next_mirror() {
        let a = Arc::new(InMemoryContentStore::new());
        let b = Arc::new(InMemoryContentStore::new());
        let address = b.upload(Bytes::from_static(b"only-b"), "").await.unwrap();
        let dispatcher = Dispatcher::new(vec![a as Arc<dyn ContentStore>, b as Arc<dyn ContentStore>], config(1)).unwrap();
        assert_eq!(&dispatcher.download(&address, 100).await.unwrap()[..], b"only-b");
    }

    #[tokio::test]
    async fn download_reports_not_found_when_all_mirrors_miss() {
        let dispatcher = Dispatcher::single(Arc::new(InMemoryContentStore::new()), config(1));
        let err = dispatcher
            .download(&ContentAddress::new("missing"), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let slow = Arc::new(InMemoryContentStore::with_latency(Duration::from_secs(5)));
        let dispatcher = Dispatcher::single(slow, config(1));
        let err = dispatcher.upload(Bytes::from_static(b"x"), "").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "upload", .. }));
    }

    #[tokio::test]
    async fn slow_download_times_out() {
        let store = Arc::new(InMemoryContentStore::new());
        let address = store.upload(Bytes::from_static(b"x"), "").await.unwrap();
        store.set_latency(Duration::from_secs(5));
        let dispatcher = Dispatcher::single(store, config(1));
        let err = dispatcher.download(&address, 10).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "download", .. }));
        assert!(err.is_retryable());
    }
}
