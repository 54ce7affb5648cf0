//! Index tree engine for skein streams.
//!
//! A stream's history is a chain of immutable, content-addressed nodes.
//! Each node carries one payload chunk plus a lookup list of earlier nodes
//! and the axis ranges reachable through them. Writing produces a new node
//! whose lookup list is rebalanced ("redepthed") so that the tree height
//! stays logarithmic in the number of writes, while still allowing any
//! byte range to be overwritten.
//!
//! # Components
//!
//! - [`node`] — [`Node`], [`LookupEntry`] and the serialized [`NodeDocument`]
//! - [`slice`] — carving lookup lists around a write
//! - [`cache`] — [`NodeCache`]: verified, memoized node resolution
//! - [`resolve`] — [`locate`]: descent to the node covering an offset
//! - [`redepth`] — rebalancing of lookup lists to a target depth
//! - [`builder`] — [`TreeBuilder`]: the write/commit path
//!
//! # Invariants
//!
//! - A node's `bytes` span matches its payload length exactly.
//! - `index` grows by exactly one per commit.
//! - Adjacent lookup entries are contiguous on the `bytes` axis.
//! - Cached nodes are never mutated; resolution returns its effective
//!   bound alongside the node.

pub mod builder;
pub mod cache;
pub mod error;
pub mod node;
pub mod redepth;
pub mod resolve;
pub mod slice;

pub use builder::{TreeBuilder, WritePlan, WriteRequest};
pub use cache::NodeCache;
pub use error::{TreeError, TreeResult};
pub use node::{Content, LookupEntry, Node, NodeDocument, FORMAT_VERSION};
pub use redepth::{condense, redepth, tree_depth};
pub use resolve::{ensure_whole_byte, locate, Located};
pub use slice::{node_with_lookup, slice};
