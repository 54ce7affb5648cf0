//! Digest provider for skein streams.
//!
//! Every payload chunk and node document is identified by a set of digests
//! computed with several independent algorithms. Downloaded content is only
//! trusted once every algorithm the caller already knows agrees.
//!
//! Hashing is delegated to the `sha3`, `sha2`, `blake2b_simd` and `blake3`
//! crates.

pub mod digest;
pub mod error;

pub use digest::{compare_digests, DigestAlgorithm, DigestProvider, MultiDigest};
pub use error::{DigestError, DigestResult};
