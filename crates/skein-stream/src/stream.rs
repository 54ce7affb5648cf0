use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use skein_crypto::{DigestProvider, MultiDigest};
use skein_store::{ContentStore, Dispatcher};
use skein_tree::{ensure_whole_byte, locate, Located, Node, NodeCache, TreeBuilder, TreeError, WriteRequest};
use skein_types::{wall_clock_seconds, Identifiers, Span, Spans, BYTES};

use crate::config::StreamConfig;
use crate::error::StreamResult;

/// Handle on one logical stream.
///
/// The handle owns the current tail node. A write builds a new node on
/// top of the tail and swaps it in only after every upload succeeded, so
/// readers see either the old or the new tail and a failed write leaves
/// the stream untouched. At most one write runs at a time per handle.
pub struct Stream {
    cache: NodeCache,
    tail: RwLock<Arc<Node>>,
    write_lock: Mutex<()>,
    config: StreamConfig,
}

impl Stream {
    /// An empty stream over `store`, digesting with every supported algorithm.
    pub fn new(store: Arc<dyn ContentStore>, config: StreamConfig) -> StreamResult<Self> {
        Self::with_digests(store, Arc::new(MultiDigest::default()), config)
    }

    /// An empty stream over `store` with an explicit digest provider.
    ///
    /// `store` is wrapped in a [`Dispatcher`] that uploads every blob
    /// `config.redundancy` times. Pass the backends themselves to
    /// [`with_backends`](Self::with_backends) rather than a prebuilt
    /// dispatcher, or the redundancy multiplies.
    pub fn with_digests(
        store: Arc<dyn ContentStore>,
        digests: Arc<dyn DigestProvider>,
        config: StreamConfig,
    ) -> StreamResult<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::single(store, config.dispatch());
        Ok(Self::from_dispatcher(dispatcher, digests, config))
    }

    /// An empty stream mirrored across an ordered list of backends.
    pub fn with_backends(
        backends: Vec<Arc<dyn ContentStore>>,
        digests: Arc<dyn DigestProvider>,
        config: StreamConfig,
    ) -> StreamResult<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::new(backends, config.dispatch())?;
        Ok(Self::from_dispatcher(dispatcher, digests, config))
    }

    /// Resume a stream over a single store from a value previously
    /// returned by [`identifiers`](Self::identifiers).
    ///
    /// Empty identifiers open a fresh stream. For several mirrors, build
    /// the handle with [`with_backends`](Self::with_backends) and call
    /// [`resume`](Self::resume).
    pub async fn open(
        store: Arc<dyn ContentStore>,
        digests: Arc<dyn DigestProvider>,
        identifiers: &Identifiers,
        config: StreamConfig,
    ) -> StreamResult<Self> {
        let stream = Self::with_digests(store, digests, config)?;
        stream.resume(identifiers).await?;
        Ok(stream)
    }

    /// Make the node identified by `identifiers` the tail of this handle.
    ///
    /// The node is downloaded and verified first; on failure the tail is
    /// unchanged. Empty identifiers leave the handle as it is.
    pub async fn resume(&self, identifiers: &Identifiers) -> StreamResult<()> {
        if identifiers.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let tail = self.cache.resolve(identifiers).await?;
        info!(tail = %identifiers.label(), "resumed stream");
        self.replace_tail(tail);
        Ok(())
    }

    fn from_dispatcher(dispatcher: Dispatcher, digests: Arc<dyn DigestProvider>, config: StreamConfig) -> Self {
        let cache = NodeCache::new(Arc::new(dispatcher), digests).with_max_node_size(config.max_node_size);
        Self {
            cache,
            tail: RwLock::new(Arc::new(Node::genesis(wall_clock_seconds()))),
            write_lock: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    /// Snapshot of the current tail.
    pub fn tail(&self) -> Arc<Node> {
        Arc::clone(&self.tail.read().expect("tail lock poisoned"))
    }

    fn replace_tail(&self, node: Arc<Node>) {
        *self.tail.write().expect("tail lock poisoned") = node;
    }

    // ---- Writes ----

    /// Write `payload` starting at `offset` on `axis`.
    ///
    /// An offset equal to the stream's end on `axis` appends. Any other
    /// offset overwrites from the chunk covering it; on axes other than
    /// `bytes` the offset must be the start of that chunk.
    pub async fn write(
        &self,
        payload: impl Into<Bytes>,
        axis: &str,
        offset: f64,
        custom_spans: Spans,
        user_metadata: Option<Value>,
    ) -> StreamResult<()> {
        let mut request = WriteRequest::new(payload, axis, offset).with_spans(custom_spans);
        request.user_metadata = user_metadata;
        self.submit(request).await
    }

    /// Apply a prepared [`WriteRequest`].
    pub async fn submit(&self, request: WriteRequest) -> StreamResult<()> {
        let _guard = self.write_lock.lock().await;
        self.commit_locked(request).await
    }

    /// Append `payload` at the current end of the stream. Returns the byte
    /// offset it was written at.
    pub async fn append(&self, payload: impl Into<Bytes>, user_metadata: Option<Value>) -> StreamResult<f64> {
        let _guard = self.write_lock.lock().await;
        let offset = self.tail().reachable_spans().require(BYTES)?.end;
        let mut request = WriteRequest::at_byte(payload, offset);
        request.user_metadata = user_metadata;
        self.commit_locked(request).await?;
        Ok(offset)
    }

    async fn commit_locked(&self, request: WriteRequest) -> StreamResult<()> {
        let tail = self.tail();
        let node = TreeBuilder::new(&self.cache)
            .write(&tail, request, wall_clock_seconds())
            .await?;
        debug!(from = %tail.identifiers.label(), to = %node.identifiers.label(), "advancing tail");
        self.replace_tail(node);
        Ok(())
    }

    // ---- Reads ----

    /// Read the chunk covering `offset` on `axis`.
    ///
    /// Returns the bytes and the offset on `axis` where the next read
    /// should start. On `bytes` the result starts exactly at `offset` and
    /// ends where the chunk stops being live. On any other axis `offset`
    /// must be the start of a chunk and the whole chunk is returned.
    pub async fn read(&self, axis: &str, offset: f64) -> StreamResult<(Bytes, f64)> {
        self.read_from(self.tail(), axis, offset).await
    }

    /// Read `[start, end)` on the `bytes` axis from one tail snapshot.
    pub async fn read_range(&self, start: f64, end: f64) -> StreamResult<Bytes> {
        ensure_whole_byte(BYTES, start)?;
        ensure_whole_byte(BYTES, end)?;
        let tail = self.tail();
        let mut out = Vec::with_capacity((end - start).max(0.0) as usize);
        let mut offset = start;
        while offset < end {
            let (chunk, next) = self.read_from(Arc::clone(&tail), BYTES, offset).await?;
            let wanted = ((end - offset) as usize).min(chunk.len());
            out.extend_from_slice(&chunk[..wanted]);
            offset = next;
        }
        Ok(Bytes::from(out))
    }

    async fn read_from(&self, tail: Arc<Node>, axis: &str, offset: f64) -> StreamResult<(Bytes, f64)> {
        ensure_whole_byte(axis, offset)?;
        let found = self.locate(tail, axis, offset, false).await?;
        let own = found.node.own_spans();
        if axis != BYTES && offset != own.require(axis)?.start {
            return Err(TreeError::AmbiguousOffset {
                axis: axis.to_string(),
                offset,
            }
            .into());
        }

        let data = self.payload(&found.node).await?;
        let next = found.bound.require(axis)?.end;
        if axis != BYTES {
            return Ok((data, next));
        }
        let chunk_start = own.require(BYTES)?.start;
        let live_end = found.bound.require(BYTES)?.end;
        let begin = (offset - chunk_start) as usize;
        let end = (live_end - chunk_start) as usize;
        Ok((data.slice(begin..end), next))
    }

    /// Verified payload of `node`; empty for a node without bytes.
    async fn payload(&self, node: &Node) -> StreamResult<Bytes> {
        let Some(identifiers) = node.payload_address() else {
            return Ok(Bytes::new());
        };
        let data = self.cache.fetch(identifiers, self.config.max_payload_size).await?;
        let expected = node.own_spans().require(BYTES)?.len();
        if data.len() as f64 != expected {
            let address = identifiers.address().cloned().ok_or(TreeError::Unaddressed)?;
            return Err(TreeError::CorruptNode {
                address,
                reason: format!("payload is {} bytes, chunk span is {expected}", data.len()),
            }
            .into());
        }
        Ok(data)
    }

    async fn locate(&self, tail: Arc<Node>, axis: &str, offset: f64, preceding: bool) -> StreamResult<Located> {
        Ok(locate(&self.cache, tail, axis, offset, None, preceding).await?)
    }

    /// Caller metadata stored with the chunk covering `offset`.
    pub async fn user_metadata(&self, axis: &str, offset: f64) -> StreamResult<Option<Value>> {
        let found = self.locate(self.tail(), axis, offset, false).await?;
        Ok(found.node.user_metadata().cloned())
    }

    /// Own spans of the chunk covering `offset` on `axis`.
    ///
    /// With `preceding`, the chunk ending at `offset` is selected instead
    /// of the one starting there.
    pub async fn chunk_spans(&self, axis: &str, offset: f64, preceding: bool) -> StreamResult<Spans> {
        let found = self.locate(self.tail(), axis, offset, preceding).await?;
        Ok(found.node.own_spans().clone())
    }

    pub async fn chunk_span(&self, axis: &str, offset: f64) -> StreamResult<Span> {
        Ok(self.chunk_spans(axis, offset, false).await?.require(axis)?)
    }

    /// Identity of the node whose chunk covers `offset` on `axis`.
    pub async fn identifiers_at(&self, axis: &str, offset: f64, preceding: bool) -> StreamResult<Identifiers> {
        let found = self.locate(self.tail(), axis, offset, preceding).await?;
        Ok(found.node.identifiers.clone())
    }

    /// Download any blob and verify it against `identifiers`.
    pub async fn fetch(&self, identifiers: &Identifiers, max_size: u64) -> StreamResult<Bytes> {
        Ok(self.cache.fetch(identifiers, max_size).await?)
    }

    // ---- Extent ----

    /// Range covered on every axis.
    pub fn spans(&self) -> Spans {
        self.tail().reachable_spans()
    }

    pub fn span(&self, axis: &str) -> StreamResult<Span> {
        Ok(self.spans().require(axis)?)
    }

    pub fn lengths(&self) -> BTreeMap<String, f64> {
        self.spans().lengths()
    }

    /// Length on `axis`; zero for an axis no chunk reports.
    pub fn length(&self, axis: &str) -> f64 {
        self.lengths().get(axis).copied().unwrap_or(0.0)
    }

    /// Identity of the current tail, for resuming with [`open`](Self::open).
    pub fn identifiers(&self) -> Identifiers {
        self.tail().identifiers.clone()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("tail", &self.tail().identifiers.label())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
