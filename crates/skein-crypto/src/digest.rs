use std::fmt;

use skein_types::Digests;

use crate::error::{DigestError, DigestResult};

/// Hash algorithms a skein stream records digests with.
///
/// The names are the keys used in serialized [`Digests`] maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Blake2b512,
    Sha3_512,
    Sha512_256,
    Blake3,
}

impl DigestAlgorithm {
    /// Every supported algorithm, in preference order.
    pub const ALL: [Self; 4] = [
        Self::Sha3_512,
        Self::Blake2b512,
        Self::Sha512_256,
        Self::Blake3,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Blake2b512 => "blake2b512",
            Self::Sha3_512 => "sha3_512",
            Self::Sha512_256 => "sha512_256",
            Self::Blake3 => "blake3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    /// Lowercase hex digest of `data`.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            Self::Blake2b512 => hex::encode(blake2b_simd::blake2b(data).as_bytes()),
            Self::Sha3_512 => hex::encode(<sha3::Sha3_512 as sha3::Digest>::digest(data)),
            Self::Sha512_256 => hex::encode(<sha2::Sha512_256 as sha2::Digest>::digest(data)),
            Self::Blake3 => hex::encode(blake3::hash(data).as_bytes()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Computes outbound digests and re-verifies inbound content.
pub trait DigestProvider: Send + Sync {
    /// Digests of `data` under every algorithm this provider supports.
    fn digests(&self, data: &[u8]) -> Digests;

    /// The digest value passed to stores as an upload hint.
    fn hint(&self, digests: &Digests) -> String;

    /// Check `data` against previously recorded digests.
    ///
    /// Every algorithm present in both `expected` and this provider must
    /// agree, and at least one must overlap.
    fn verify(&self, data: &[u8], expected: &Digests) -> DigestResult<()> {
        compare_digests(&self.digests(data), expected)
    }
}

/// Compare two digest sets.
///
/// Every algorithm present in both must agree, and at least one must
/// overlap.
pub fn compare_digests(computed: &Digests, expected: &Digests) -> DigestResult<()> {
    let mut checked = 0usize;
    for (algorithm, value) in computed {
        let Some(recorded) = expected.get(algorithm) else {
            continue;
        };
        if recorded != value {
            return Err(DigestError::Mismatch {
                algorithm: algorithm.clone(),
                expected: recorded.clone(),
                computed: value.clone(),
            });
        }
        checked += 1;
    }
    if checked == 0 {
        return Err(DigestError::Unverifiable {
            known: expected.keys().cloned().collect(),
        });
    }
    Ok(())
}

/// [`DigestProvider`] computing a fixed set of algorithms.
///
/// The default set is every [`DigestAlgorithm`]; the first algorithm in
/// the set supplies the upload hint.
#[derive(Clone, Debug)]
pub struct MultiDigest {
    algorithms: Vec<DigestAlgorithm>,
}

impl MultiDigest {
    /// Provider for the given algorithms. An empty list falls back to all.
    pub fn new(algorithms: Vec<DigestAlgorithm>) -> Self {
        if algorithms.is_empty() {
            return Self::default();
        }
        Self { algorithms }
    }

    pub fn algorithms(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }
}

impl Default for MultiDigest {
    fn default() -> Self {
        Self {
            algorithms: DigestAlgorithm::ALL.to_vec(),
        }
    }
}

impl DigestProvider for MultiDigest {
    fn digests(&self, data: &[u8]) -> Digests {
        self.algorithms
            .iter()
            .map(|alg| (alg.name().to_string(), alg.hex_digest(data)))
            .collect()
    }

    fn hint(&self, digests: &Digests) -> String {
        self.algorithms
            .iter()
            .find_map(|alg| digests.get(alg.name()))
            .or_else(|| digests.values().next())
            .cloned()
            .unwrap_or_default()
    }
}
