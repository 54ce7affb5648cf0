//! Carving lookup lists.
//!
//! Writes and redepth expansion both need "the part of this history that
//! lies strictly between two points". Positional carving happens on the
//! `bytes` axis, the only axis on which later writes displace earlier
//! data; callers pass bounds restricted to `bytes` and every other axis of
//! a surviving entry is carried through unchanged.

use skein_types::{Span, Spans, BYTES};

use crate::node::{LookupEntry, Node};

/// The node's own chunk inserted into its lookup list as an entry of the
/// given depth.
///
/// The own entry goes immediately before the first entry that starts where
/// the own chunk ends on `bytes`, or at the end if there is none, which
/// keeps the list in byte order.
pub fn node_with_lookup(node: &Node, depth: u32) -> Vec<LookupEntry> {
    let own_end = node.own_spans().get(BYTES).map(|span| span.end);
    let mut own = Some(node.as_entry(depth));
    let mut entries = Vec::with_capacity(node.lookup().len() + 1);
    for entry in node.lookup() {
        let starts_at_own_end = entry.spans.get(BYTES).map(|span| span.start) == own_end;
        if starts_at_own_end {
            if let Some(own) = own.take() {
                entries.push(own);
            }
        }
        entries.push(entry.clone());
    }
    if let Some(own) = own {
        entries.push(own);
    }
    entries
}

/// Trim every entry to lie strictly after `prev` and strictly before
/// `next`.
///
/// On each axis named by a bound:
/// - entries ending at or before `prev.end` are dropped (superseded),
/// - entries starting at or after `next.start` are dropped (not reached),
/// - entries crossing a bound are trimmed on that axis only.
///
/// Axes named by neither bound are kept as they are.
pub fn slice(entries: &[LookupEntry], prev: Option<&Spans>, next: Option<&Spans>) -> Vec<LookupEntry> {
    entries
        .iter()
        .filter_map(|entry| slice_entry(entry, prev, next))
        .collect()
}

fn slice_entry(entry: &LookupEntry, prev: Option<&Spans>, next: Option<&Spans>) -> Option<LookupEntry> {
    let mut spans = Spans::new();
    for (axis, span) in entry.spans.iter() {
        let mut trimmed = *span;
        let mut bounded = false;
        if let Some(bound) = prev.and_then(|p| p.get(axis)) {
            if span.end <= bound.end {
                return None;
            }
            trimmed.start = trimmed.start.max(bound.end);
            bounded = true;
        }
        if let Some(bound) = next.and_then(|n| n.get(axis)) {
            if span.start >= bound.start {
                return None;
            }
            trimmed.end = trimmed.end.min(bound.start);
            bounded = true;
        }
        if bounded && trimmed.is_empty() {
            return None;
        }
        spans.insert(axis, trimmed);
    }
    Some(LookupEntry {
        identifiers: entry.identifiers.clone(),
        spans,
        depth: entry.depth,
    })
}

/// Bounds that select exactly `spans`' byte range when passed to [`slice`]
/// as `(prev, next)`.
pub(crate) fn surrounding_bounds(spans: &Spans) -> (Option<Spans>, Option<Spans>) {
    match spans.get(BYTES) {
        Some(bytes) => (
            Some(Spans::new().with(BYTES, Span::point(bytes.start))),
            Some(Spans::new().with(BYTES, Span::point(bytes.end))),
        ),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Content, NodeDocument, FORMAT_VERSION};
    use skein_types::{ContentAddress, Identifiers, INDEX, TIME};

    fn ids(name: &str) -> Identifiers {
        Identifiers::default().with_address(ContentAddress::new(name))
    }

    fn entry(name: &str, start: f64, end: f64, depth: u32) -> LookupEntry {
        LookupEntry {
            identifiers: ids(name),
            spans: Spans::new()
                .with(BYTES, Span::new(start, end))
                .with(TIME, Span::new(1.0, 2.0)),
            depth,
        }
    }

    fn node(name: &str, start: f64, end: f64, lookup: Vec<LookupEntry>) -> Node {
        Node::new(
            ids(name),
            NodeDocument {
                format_version: FORMAT_VERSION.into(),
                content: Content {
                    spans: Spans::new()
                        .with(BYTES, Span::new(start, end))
                        .with(INDEX, Span::new(5.0, 6.0)),
                    identifiers: Some(ids("payload")),
                },
                lookup,
                metadata: None,
            },
        )
    }

    fn bytes(at: f64) -> Spans {
        Spans::new().with(BYTES, Span::point(at))
    }

    fn byte_ranges(entries: &[LookupEntry]) -> Vec<(f64, f64)> {
        entries
            .iter()
            .map(|e| {
                let span = e.spans.get(BYTES).unwrap();
                (span.start, span.end)
            })
            .collect()
    }

    #[test]
    fn own_entry_appended_after_earlier_history() {
        let tail = node("t", 10.0, 15.0, vec![entry("a", 0.0, 10.0, 1)]);
        let list = node_with_lookup(&tail, 0);
        assert_eq!(byte_ranges(&list), vec![(0.0, 10.0), (10.0, 15.0)]);
        assert_eq!(list[1].identifiers, ids("t"));
        assert_eq!(list[1].depth, 0);
    }

    #[test]
    fn own_entry_inserted_in_byte_order() {
        let tail = node(
            "t",
            3.0,
            7.0,
            vec![entry("a", 0.0, 3.0, 0), entry("a", 7.0, 10.0, 0)],
        );
        let list = node_with_lookup(&tail, 0);
        assert_eq!(byte_ranges(&list), vec![(0.0, 3.0), (3.0, 7.0), (7.0, 10.0)]);
        assert_eq!(list[1].identifiers, ids("t"));
    }

    #[test]
    fn slice_before_write_trims_end() {
        let list = vec![entry("a", 0.0, 5.0, 0), entry("b", 5.0, 10.0, 0)];
        let out = slice(&list, None, Some(&bytes(3.0)));
        assert_eq!(byte_ranges(&out), vec![(0.0, 3.0)]);
    }

    #[test]
    fn slice_after_write_trims_start() {
        let list = vec![entry("a", 0.0, 5.0, 0), entry("b", 5.0, 10.0, 0)];
        let out = slice(&list, Some(&bytes(7.0)), None);
        assert_eq!(byte_ranges(&out), vec![(7.0, 10.0)]);
    }

    #[test]
    fn slice_between_bounds() {
        let list = vec![
            entry("a", 0.0, 5.0, 0),
            entry("b", 5.0, 10.0, 0),
            entry("c", 10.0, 20.0, 0),
        ];
        let out = slice(&list, Some(&bytes(3.0)), Some(&bytes(12.0)));
        assert_eq!(byte_ranges(&out), vec![(3.0, 5.0), (5.0, 10.0), (10.0, 12.0)]);
    }

    #[test]
    fn slice_keeps_unbounded_axes() {
        let list = vec![entry("a", 0.0, 10.0, 3)];
        let out = slice(&list, Some(&bytes(2.0)), None);
        assert_eq!(out[0].spans.get(TIME), Some(&Span::new(1.0, 2.0)));
        assert_eq!(out[0].depth, 3);
    }

    #[test]
    fn zero_length_entries_vanish() {
        let list = vec![entry("genesis", 0.0, 0.0, 0)];
        assert!(slice(&list, None, Some(&bytes(0.0))).is_empty());
        assert!(slice(&list, Some(&bytes(5.0)), None).is_empty());
    }

    #[test]
    fn surrounding_bounds_select_the_range() {
        let target = Spans::new().with(BYTES, Span::new(4.0, 8.0));
        let (prev, next) = surrounding_bounds(&target);
        let list = vec![entry("a", 0.0, 6.0, 0), entry("b", 6.0, 12.0, 0)];
        let out = slice(&list, prev.as_ref(), next.as_ref());
        assert_eq!(byte_ranges(&out), vec![(4.0, 6.0), (6.0, 8.0)]);
    }
}
