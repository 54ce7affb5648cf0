//! Rebalancing of lookup lists.
//!
//! Every write rebuilds the tail's lookup list at a target depth. Entries
//! shallower than the target are wrapped: they are re-pointed at the node
//! whose lookup list they came from, one tier deeper. Entries deeper than
//! the target are expanded into the sliced lookup list of the node they
//! reference. Adjacent entries that end up referencing the same node are
//! then condensed into one. Appending therefore behaves like a binary
//! counter: pairs of equal-depth entries collapse into a single deeper one.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use skein_types::BYTES;

use crate::cache::NodeCache;
use crate::error::{TreeError, TreeResult};
use crate::node::{LookupEntry, Node};
use crate::slice::{node_with_lookup, slice, surrounding_bounds};

/// Boxed future used for the recursive expansion step.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Rebuild `entries` so that every entry reaches `target` depth.
///
/// `context` is the node `entries` were taken from; wrapped entries are
/// re-pointed at it.
pub fn redepth<'a>(
    cache: &'a NodeCache,
    entries: Vec<LookupEntry>,
    target: u32,
    context: &'a Node,
) -> BoxFuture<'a, TreeResult<Vec<LookupEntry>>> {
    Box::pin(async move {
        let mut rebuilt = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.depth < target && entry.identifiers != context.identifiers {
                rebuilt.push(LookupEntry {
                    identifiers: context.identifiers.clone(),
                    spans: entry.spans,
                    depth: entry.depth + 1,
                });
            } else if entry.depth > target {
                let node = cache.resolve(&entry.identifiers).await?;
                debug!(node = %entry.identifiers.label(), depth = entry.depth, target, "expanding entry");
                let (prev, next) = surrounding_bounds(&entry.spans);
                let sublist = slice(&node_with_lookup(&node, 0), prev.as_ref(), next.as_ref());
                rebuilt.extend(redepth(cache, sublist, target, &node).await?);
            } else {
                rebuilt.push(entry);
            }
        }
        condense(rebuilt)
    })
}

/// Merge adjacent entries that reference the same node.
///
/// The merged entry takes the greater depth. Its `bytes` span must join
/// without a gap; every other axis takes the hull of both entries.
pub fn condense(entries: Vec<LookupEntry>) -> TreeResult<Vec<LookupEntry>> {
    let mut condensed: Vec<LookupEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(prev) = condensed.last_mut() {
            if prev.identifiers == entry.identifiers {
                merge(prev, &entry)?;
                continue;
            }
        }
        condensed.push(entry);
    }
    Ok(condensed)
}

fn merge(prev: &mut LookupEntry, next: &LookupEntry) -> TreeResult<()> {
    let end = prev.spans.require(BYTES)?.end;
    let start = next.spans.require(BYTES)?.start;
    if end != start {
        return Err(TreeError::Discontiguous { end, start });
    }
    prev.depth = prev.depth.max(next.depth);
    prev.spans.extend_hull(&next.spans);
    Ok(())
}

/// Maximal depth of a lookup list, and whether it is full.
///
/// A list is full when two adjacent entries both carry the maximal depth.
pub fn tree_depth(entries: &[LookupEntry]) -> (u32, bool) {
    let depth = entries.iter().map(|e| e.depth).max().unwrap_or(0);
    let full = entries
        .windows(2)
        .any(|pair| pair[0].depth == depth && pair[1].depth == depth);
    (depth, full)
}
