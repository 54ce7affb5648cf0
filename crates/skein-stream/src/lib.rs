//! Stream facade for skein.
//!
//! A [`Stream`] is a handle on one logical byte stream whose history lives
//! in a content store as a tree of immutable nodes. Writes may append or
//! overwrite any byte range; reads return verified payload bytes for any
//! `bytes`, `index`, `time` or caller-defined axis position.
//!
//! Writes through one handle are serialized. Reads run concurrently with a
//! write and always observe either the tail before it or the tail after it.
//! The handle can be resumed later from the value returned by
//! [`Stream::identifiers`].

pub mod config;
pub mod error;
pub mod stream;

pub use config::StreamConfig;
pub use error::{StreamError, StreamResult};
pub use stream::Stream;

// Re-export key types
pub use skein_crypto::{DigestAlgorithm, DigestProvider, MultiDigest};
pub use skein_store::{ContentStore, DispatchConfig, Dispatcher, InMemoryContentStore};
pub use skein_tree::{Node, TreeError};
pub use skein_types::{ContentAddress, Identifiers, Span, Spans, BYTES, INDEX, TIME};
