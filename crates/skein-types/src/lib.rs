//! Foundation types for skein streams.
//!
//! A skein stream is a content-addressed byte stream whose history is kept
//! as a tree of immutable nodes. Every node records the ranges it covers on
//! a set of named axes. This crate provides those value types; every other
//! skein crate depends on `skein-types`.
//!
//! # Key Types
//!
//! - [`Span`] — half-open `[start, end)` range on one axis
//! - [`Spans`] — axis name to [`Span`] map carried by nodes and lookup entries
//! - [`ContentAddress`] — locator returned by a content store
//! - [`Identifiers`] — digests plus optional address identifying a blob
//!
//! # Reserved Axes
//!
//! - [`BYTES`] — payload byte offset, contiguous across the stream
//! - [`TIME`] — wall-clock seconds at write time, non-decreasing
//! - [`INDEX`] — write sequence counter, one per commit

pub mod clock;
pub mod error;
pub mod identity;
pub mod span;

pub use clock::wall_clock_seconds;
pub use error::TypeError;
pub use identity::{ContentAddress, Digests, Identifiers};
pub use span::{is_reserved, Span, Spans, BYTES, INDEX, RESERVED_AXES, TIME};
