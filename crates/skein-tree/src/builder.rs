//! The write path: planning a new tail node and committing it.
//!
//! A write is split in two phases. [`TreeBuilder::plan`] resolves the
//! boundaries of the write against the current tail and computes the new
//! node's spans and rebalanced lookup list; it performs no uploads.
//! [`TreeBuilder::commit`] uploads the payload and the node document and
//! returns the new tail. Neither phase touches the caller's tail, so any
//! error leaves the stream exactly as it was.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};

use skein_types::{Identifiers, Span, Spans, BYTES, INDEX, TIME};

use crate::cache::NodeCache;
use crate::error::{TreeError, TreeResult};
use crate::node::{Content, LookupEntry, Node, NodeDocument, FORMAT_VERSION};
use crate::redepth::{redepth, tree_depth};
use crate::resolve::{ensure_whole_byte, locate};
use crate::slice::{node_with_lookup, slice};

/// A single write against a stream.
#[derive(Clone, Debug)]
pub struct WriteRequest {
    pub payload: Bytes,
    /// Axis on which `offset` is expressed.
    pub axis: String,
    /// Position on `axis` where the payload begins.
    pub offset: f64,
    /// Extra caller-defined axis ranges for the new chunk.
    pub custom_spans: Spans,
    pub user_metadata: Option<Value>,
}

impl WriteRequest {
    pub fn new(payload: impl Into<Bytes>, axis: impl Into<String>, offset: f64) -> Self {
        Self {
            payload: payload.into(),
            axis: axis.into(),
            offset,
            custom_spans: Spans::new(),
            user_metadata: None,
        }
    }

    /// Write at a byte offset.
    pub fn at_byte(payload: impl Into<Bytes>, offset: f64) -> Self {
        Self::new(payload, BYTES, offset)
    }

    pub fn with_spans(mut self, custom_spans: Spans) -> Self {
        self.custom_spans = custom_spans;
        self
    }

    pub fn with_metadata(mut self, user_metadata: Value) -> Self {
        self.user_metadata = Some(user_metadata);
        self
    }
}

/// Everything about the next node that can be decided before uploading.
#[derive(Clone, Debug, PartialEq)]
pub struct WritePlan {
    /// Own spans of the new node.
    pub spans: Spans,
    /// Rebalanced lookup list, with the written range carved out.
    pub lookup: Vec<LookupEntry>,
    /// Target depth the lookup list was rebalanced to.
    pub depth: u32,
    /// Whether the write introduces a chunk boundary that did not exist.
    pub extra_leaf: bool,
}

/// Builds new tail nodes on top of an existing tail.
pub struct TreeBuilder<'a> {
    cache: &'a NodeCache,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(cache: &'a NodeCache) -> Self {
        Self { cache }
    }

    /// Plan and commit `request` on top of `tail`, returning the new tail.
    pub async fn write(&self, tail: &Arc<Node>, request: WriteRequest, now: f64) -> TreeResult<Arc<Node>> {
        let plan = self.plan(tail, &request, now).await?;
        self.commit(plan, request.payload, request.user_metadata).await
    }

    /// Compute the spans and lookup list of the node that would result
    /// from applying `request` to `tail` at wall-clock time `now`.
    pub async fn plan(&self, tail: &Arc<Node>, request: &WriteRequest, now: f64) -> TreeResult<WritePlan> {
        if request.payload.is_empty() {
            return Err(TreeError::EmptyWrite);
        }
        request.custom_spans.ensure_custom()?;

        let axis = request.axis.as_str();
        let offset = request.offset;
        ensure_whole_byte(axis, offset)?;
        let own = tail.own_spans();
        let extent = tail.reachable_spans();

        // where the write starts in byte space
        let mut extra_leaf = false;
        let start_bytes = if offset == extent.require(axis)?.end {
            extra_leaf = true;
            extent.require(BYTES)?.end
        } else {
            let head = locate(self.cache, Arc::clone(tail), axis, offset, None, false).await?;
            let head_start = head.bound.require(axis)?.start;
            if axis == BYTES {
                if offset != head_start {
                    extra_leaf = true;
                }
                offset
            } else if offset != head_start {
                return Err(TreeError::AmbiguousOffset {
                    axis: axis.to_string(),
                    offset,
                });
            } else {
                head.bound.require(BYTES)?.start
            }
        };
        let end_bytes = start_bytes + request.payload.len() as f64;

        let time_start = own.require(TIME)?.end;
        let index_start = own.require(INDEX)?.end;
        let mut spans = Spans::new()
            .with(BYTES, Span::new(start_bytes, end_bytes))
            .with(TIME, Span::new(time_start, now.max(time_start)))
            .with(INDEX, Span::new(index_start, index_start + 1.0));
        for (custom, span) in request.custom_spans.iter() {
            spans.insert(custom, *span);
        }

        // a write ending inside a chunk, or past the end, adds a boundary
        match locate(self.cache, Arc::clone(tail), BYTES, end_bytes, None, false).await {
            Ok(found) => {
                if found.bound.require(BYTES)?.start != end_bytes {
                    extra_leaf = true;
                }
            }
            Err(TreeError::OutOfRange { .. }) => extra_leaf = true,
            Err(err) => return Err(err),
        }

        let (mut depth, full) = tree_depth(tail.lookup());
        if full && extra_leaf {
            depth += 1;
        }

        let rebalanced = redepth(self.cache, node_with_lookup(tail, 0), depth, tail).await?;
        let written = spans.only(BYTES);
        let mut lookup = slice(&rebalanced, None, Some(&written));
        lookup.extend(slice(&rebalanced, Some(&written), None));

        debug!(
            start = start_bytes,
            end = end_bytes,
            depth,
            extra_leaf,
            entries = lookup.len(),
            "planned write"
        );
        Ok(WritePlan {
            spans,
            lookup,
            depth,
            extra_leaf,
        })
    }

    /// Upload `payload` and the node document described by `plan`.
    ///
    /// The new node is inserted into the cache and returned; installing it
    /// as the stream's tail is the caller's job.
    pub async fn commit(&self, plan: WritePlan, payload: Bytes, user_metadata: Option<Value>) -> TreeResult<Arc<Node>> {
        let digests = self.cache.digests();
        let store = self.cache.store();

        let payload_digests = digests.digests(&payload);
        let payload_address = store
            .upload(payload, &digests.hint(&payload_digests))
            .await?;

        let document = NodeDocument {
            format_version: FORMAT_VERSION.to_string(),
            content: Content {
                spans: plan.spans,
                identifiers: Some(Identifiers::new(payload_digests).with_address(payload_address)),
            },
            lookup: plan.lookup,
            metadata: user_metadata,
        };
        let encoded = Bytes::from(document.to_vec()?);
        let node_digests = digests.digests(&encoded);
        let address = store.upload(encoded, &digests.hint(&node_digests)).await?;

        let node = self
            .cache
            .insert(Node::new(Identifiers::new(node_digests).with_address(address), document));
        let own = node.own_spans();
        info!(
            index = own.get(INDEX).map(|s| s.start),
            bytes = %own.get(BYTES).copied().unwrap_or(Span::point(0.0)),
            address = %node.identifiers.label(),
            lookup = node.lookup().len(),
            "committed node"
        );
        Ok(node)
    }
}
