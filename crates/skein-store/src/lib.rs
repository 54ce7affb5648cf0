//! Content store client for skein streams.
//!
//! Payload chunks and node documents are kept in an external
//! content-addressable store. This crate defines the capability the stream
//! engine consumes ([`ContentStore`]), a deterministic in-memory backend,
//! and the [`Dispatcher`] that fans uploads out to redundant attempts and
//! downloads across mirrors.
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. An upload is accepted only when every redundant attempt succeeded and
//!    all of them returned the same address.
//! 3. Every transfer attempt is bounded by a timeout.
//! 4. The store never interprets blob contents and never verifies digests;
//!    verification belongs to the caller, who knows the recorded digests.

pub mod dispatch;
pub mod error;
pub mod memory;
pub mod traits;

pub use dispatch::{DispatchConfig, Dispatcher};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
