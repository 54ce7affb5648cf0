use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Locator for a blob held by a content store.
///
/// The store derives the address from the blob's content, so the same
/// bytes always map to the same address on a deterministic backend.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 characters) for log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((cut, _)) => &self.0[..cut],
            None => &self.0,
        }
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.short())
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Digest values keyed by algorithm name (`"sha3_512"` → lowercase hex).
pub type Digests = BTreeMap<String, String>;

/// Identity of a stored blob: its digests plus, once uploaded, the address
/// the store returned for it.
///
/// Two identifiers are the same target only if both digests and address
/// agree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    pub digests: Digests,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ContentAddress>,
}

impl Identifiers {
    pub fn new(digests: Digests) -> Self {
        Self {
            digests,
            address: None,
        }
    }

    pub fn with_address(mut self, address: ContentAddress) -> Self {
        self.address = Some(address);
        self
    }

    pub fn address(&self) -> Option<&ContentAddress> {
        self.address.as_ref()
    }

    /// `true` for the identity of a stream that has never been written.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty() && self.address.is_none()
    }

    /// Short label for log lines: the address if known, else a digest.
    pub fn label(&self) -> String {
        match (&self.address, self.digests.values().next()) {
            (Some(address), _) => address.short().to_string(),
            (None, Some(digest)) => digest.chars().take(12).collect(),
            (None, None) => "<genesis>".to_string(),
        }
    }
}
