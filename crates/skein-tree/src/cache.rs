//! Memoized, verified node resolution.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tracing::debug;

use skein_crypto::{compare_digests, DigestProvider};
use skein_store::ContentStore;
use skein_types::{ContentAddress, Identifiers};

use crate::error::{TreeError, TreeResult};
use crate::node::{Node, NodeDocument};

/// Default download cap for node documents.
pub const DEFAULT_MAX_NODE_SIZE: u64 = 4 * 1024 * 1024;

/// Process-local `ContentAddress → Node` table.
///
/// Entries are inserted once and never mutated: content-addressed data
/// never changes, so a later resolution of the same address is an
/// idempotent re-derivation. Concurrent population is safe; the first
/// inserted node wins and every caller receives that same `Arc`.
///
/// The cache also owns the handles to the content store and the digest
/// provider, since every resolution needs both.
pub struct NodeCache {
    store: Arc<dyn ContentStore>,
    digests: Arc<dyn DigestProvider>,
    nodes: RwLock<HashMap<ContentAddress, Arc<Node>>>,
    max_node_size: u64,
}

impl NodeCache {
    pub fn new(store: Arc<dyn ContentStore>, digests: Arc<dyn DigestProvider>) -> Self {
        Self {
            store,
            digests,
            nodes: RwLock::new(HashMap::new()),
            max_node_size: DEFAULT_MAX_NODE_SIZE,
        }
    }

    /// Override the download cap for node documents.
    pub fn with_max_node_size(mut self, max_node_size: u64) -> Self {
        self.max_node_size = max_node_size;
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn digests(&self) -> &Arc<dyn DigestProvider> {
        &self.digests
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().expect("cache lock poisoned").is_empty()
    }

    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.nodes
            .read()
            .expect("cache lock poisoned")
            .contains_key(address)
    }

    /// The node identified by `identifiers`, downloading and verifying it
    /// on first use.
    ///
    /// A digest mismatch or malformed document is a [`TreeError::CorruptNode`]
    /// and nothing is cached. A cache hit is only returned if the cached
    /// node's digests agree with `identifiers`.
    pub async fn resolve(&self, identifiers: &Identifiers) -> TreeResult<Arc<Node>> {
        let address = identifiers.address().ok_or(TreeError::Unaddressed)?;
        let cached = self
            .nodes
            .read()
            .expect("cache lock poisoned")
            .get(address)
            .cloned();
        if let Some(node) = cached {
            compare_digests(&node.identifiers.digests, &identifiers.digests).map_err(|e| {
                TreeError::CorruptNode {
                    address: address.clone(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(node);
        }

        let data = self.store.download(address, self.max_node_size).await?;
        self.digests
            .verify(&data, &identifiers.digests)
            .map_err(|e| TreeError::CorruptNode {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        let document = NodeDocument::from_slice(address, &data)?;
        Ok(self.insert(Node::new(identifiers.clone(), document)))
    }

    /// Cache a node produced locally (a fresh commit) without downloading it.
    ///
    /// Nodes without an address are returned uncached.
    pub fn insert(&self, node: Node) -> Arc<Node> {
        let Some(address) = node.identifiers.address().cloned() else {
            return Arc::new(node);
        };
        let mut nodes = self.nodes.write().expect("cache lock poisoned");
        let cached = nodes.entry(address.clone()).or_insert_with(|| {
            debug!(address = address.short(), "cached node");
            Arc::new(node)
        });
        Arc::clone(cached)
    }

    /// Download any blob and verify it against its recorded digests.
    pub async fn fetch(&self, identifiers: &Identifiers, max_size: u64) -> TreeResult<Bytes> {
        let address = identifiers.address().ok_or(TreeError::Unaddressed)?;
        let data = self.store.download(address, max_size).await?;
        self.digests
            .verify(&data, &identifiers.digests)
            .map_err(|source| TreeError::Digest {
                address: address.clone(),
                source,
            })?;
        Ok(data)
    }
}

impl std::fmt::Debug for NodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCache")
            .field("nodes", &self.len())
            .field("max_node_size", &self.max_node_size)
            .finish()
    }
}
