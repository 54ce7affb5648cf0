//! Node types of the index tree.
//!
//! A [`Node`] pairs the identity of a stored node document with the decoded
//! [`NodeDocument`]. Nodes are immutable once committed; rewriting history
//! means committing a new node whose lookup list references old nodes for
//! the ranges that did not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use skein_types::{ContentAddress, Identifiers, Span, Spans, BYTES, INDEX, TIME};

use crate::error::{TreeError, TreeResult};

/// Schema version written into every node document.
pub const FORMAT_VERSION: &str = "skein-stream/1";

/// A reference from one node to an earlier node, with the axis ranges
/// reachable through it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// The referenced node.
    pub identifiers: Identifiers,
    /// Ranges reachable through the referenced node, transitively.
    pub spans: Spans,
    /// Rebalancing tier: 0 points at a node whose own chunk was just
    /// attached; higher tiers have absorbed merges.
    pub depth: u32,
}

/// The directly attached payload chunk of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub spans: Spans,
    /// Identity of the raw payload; absent iff the `bytes` span is empty.
    #[serde(default)]
    pub identifiers: Option<Identifiers>,
}

/// The serialized form of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub format_version: String,
    pub content: Content,
    #[serde(default)]
    pub lookup: Vec<LookupEntry>,
    /// Opaque caller-supplied document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl NodeDocument {
    /// The document of a stream that has never been written.
    pub fn genesis(now: f64) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            content: Content {
                spans: Spans::new()
                    .with(TIME, Span::point(now))
                    .with(INDEX, Span::point(0.0))
                    .with(BYTES, Span::point(0.0)),
                identifiers: None,
            },
            lookup: Vec::new(),
            metadata: None,
        }
    }

    /// Encode as JSON.
    pub fn to_vec(&self) -> TreeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TreeError::Serialization(e.to_string()))
    }

    /// Decode and validate a document downloaded from `address`.
    pub fn from_slice(address: &ContentAddress, data: &[u8]) -> TreeResult<Self> {
        let corrupt = |reason: String| TreeError::CorruptNode {
            address: address.clone(),
            reason,
        };
        let doc: NodeDocument =
            serde_json::from_slice(data).map_err(|e| corrupt(format!("malformed document: {e}")))?;
        if doc.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                doc.format_version
            )));
        }
        let bytes = doc
            .content
            .spans
            .get(BYTES)
            .ok_or_else(|| corrupt("content has no bytes span".into()))?;
        if bytes.is_empty() != doc.content.identifiers.is_none() {
            return Err(corrupt("payload identifiers do not match bytes span".into()));
        }
        if let Some(entry) = doc.lookup.iter().find(|e| !e.spans.contains_axis(BYTES)) {
            return Err(corrupt(format!(
                "lookup entry {} has no bytes span",
                entry.identifiers.label()
            )));
        }
        Ok(doc)
    }
}

/// A resolved node: identity plus decoded document.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub identifiers: Identifiers,
    pub document: NodeDocument,
}

impl Node {
    pub fn new(identifiers: Identifiers, document: NodeDocument) -> Self {
        Self {
            identifiers,
            document,
        }
    }

    /// The unwritten root of a fresh stream. Its identity is empty.
    pub fn genesis(now: f64) -> Self {
        Self::new(Identifiers::default(), NodeDocument::genesis(now))
    }

    pub fn identity(&self) -> &Identifiers {
        &self.identifiers
    }

    pub fn format_version(&self) -> &str {
        &self.document.format_version
    }

    /// Spans of the directly attached payload chunk.
    pub fn own_spans(&self) -> &Spans {
        &self.document.content.spans
    }

    /// Identity of the payload chunk, if the node carries bytes.
    pub fn payload_address(&self) -> Option<&Identifiers> {
        self.document.content.identifiers.as_ref()
    }

    pub fn lookup(&self) -> &[LookupEntry] {
        &self.document.lookup
    }

    pub fn user_metadata(&self) -> Option<&Value> {
        self.document.metadata.as_ref()
    }

    /// Hull of the own chunk and every top-level lookup entry: the ranges
    /// reachable from this node as a root.
    pub fn reachable_spans(&self) -> Spans {
        let mut spans = self.own_spans().clone();
        for entry in self.lookup() {
            spans.extend_hull(&entry.spans);
        }
        spans
    }

    /// A lookup entry pointing at this node's own chunk.
    pub fn as_entry(&self, depth: u32) -> LookupEntry {
        LookupEntry {
            identifiers: self.identifiers.clone(),
            spans: self.own_spans().clone(),
            depth,
        }
    }
}
