use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Payload byte offset. Mandatory on every node.
pub const BYTES: &str = "bytes";
/// Wall-clock seconds at write time.
pub const TIME: &str = "time";
/// Write sequence counter.
pub const INDEX: &str = "index";

/// Axis names that callers may not supply as custom spans.
pub const RESERVED_AXES: [&str; 3] = [BYTES, TIME, INDEX];

/// Returns `true` if `axis` is one of the [`RESERVED_AXES`].
pub fn is_reserved(axis: &str) -> bool {
    RESERVED_AXES.contains(&axis)
}

/// A half-open numeric range `[start, end)` on one axis.
///
/// Offsets are `f64` on every axis: `time` is fractional seconds, and
/// `bytes`/`index` offsets are integral values well below 2^53.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    /// Create a span from `start` to `end`.
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// A zero-length span sitting at `at`.
    pub const fn point(at: f64) -> Self {
        Self { start: at, end: at }
    }

    /// Length of the span (never negative).
    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Returns `true` if the span covers nothing.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `offset` falls inside the span.
    ///
    /// With `preceding == false` the span is treated as `[start, end)`;
    /// with `preceding == true` it is treated as `(start, end]`, which
    /// selects the span *ending* at `offset` rather than the one starting
    /// there.
    pub fn contains(&self, offset: f64, preceding: bool) -> bool {
        if preceding {
            offset > self.start && offset <= self.end
        } else {
            offset >= self.start && offset < self.end
        }
    }

    /// Intersection of `self` with `bound`.
    ///
    /// The result is empty (`start == end`) when the ranges do not overlap.
    pub fn intersect(&self, bound: &Span) -> Span {
        let start = self.start.max(bound.start);
        let end = self.end.min(bound.end);
        if end < start {
            Span::point(start)
        } else {
            Span { start, end }
        }
    }

    /// Both bounds are finite and `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn hull(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Map from axis name to [`Span`].
///
/// Serialized as a JSON object `{axis: {start, end}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spans(BTreeMap<String, Span>);

impl Spans {
    /// An empty span map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, axis: impl Into<String>, span: Span) -> Self {
        self.0.insert(axis.into(), span);
        self
    }

    /// Insert or replace the span for `axis`.
    pub fn insert(&mut self, axis: impl Into<String>, span: Span) -> Option<Span> {
        self.0.insert(axis.into(), span)
    }

    pub fn get(&self, axis: &str) -> Option<&Span> {
        self.0.get(axis)
    }

    /// The span for `axis`, or [`TypeError::MissingAxis`].
    pub fn require(&self, axis: &str) -> Result<Span, TypeError> {
        self.0
            .get(axis)
            .copied()
            .ok_or_else(|| TypeError::MissingAxis(axis.to_string()))
    }

    pub fn contains_axis(&self, axis: &str) -> bool {
        self.0.contains_key(axis)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Span)> {
        self.0.iter().map(|(axis, span)| (axis.as_str(), span))
    }

    pub fn axes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// A copy holding only the span for `axis` (empty if absent).
    pub fn only(&self, axis: &str) -> Spans {
        let mut out = Spans::new();
        if let Some(span) = self.0.get(axis) {
            out.insert(axis, *span);
        }
        out
    }

    /// Intersect every axis of `self` with the same axis of `bound`.
    ///
    /// Axes that `bound` does not mention are kept as-is; axes only in
    /// `bound` are not added.
    pub fn intersect(&self, bound: &Spans) -> Spans {
        Spans(
            self.0
                .iter()
                .map(|(axis, span)| {
                    let span = match bound.get(axis) {
                        Some(limit) => span.intersect(limit),
                        None => *span,
                    };
                    (axis.clone(), span)
                })
                .collect(),
        )
    }

    /// Widen `self` so that every axis also covers `other`'s range.
    pub fn extend_hull(&mut self, other: &Spans) {
        for (axis, span) in other.iter() {
            self.0
                .entry(axis.to_string())
                .and_modify(|mine| *mine = mine.hull(span))
                .or_insert(*span);
        }
    }

    /// Reject caller-supplied spans that name a reserved axis or carry
    /// bounds that cannot be stored (non-finite, or `end < start`).
    pub fn ensure_custom(&self) -> Result<(), TypeError> {
        for (axis, span) in self.iter() {
            if is_reserved(axis) {
                return Err(TypeError::ReservedAxis(axis.to_string()));
            }
            if !span.is_valid() {
                return Err(TypeError::InvalidSpan {
                    axis: axis.to_string(),
                    start: span.start,
                    end: span.end,
                });
            }
        }
        Ok(())
    }

    /// Length of every axis.
    pub fn lengths(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(axis, span)| (axis.clone(), span.len()))
            .collect()
    }
}

impl FromIterator<(String, Span)> for Spans {
    fn from_iter<I: IntoIterator<Item = (String, Span)>>(iter: I) -> Self {
        Spans(iter.into_iter().collect())
    }
}

impl IntoIterator for Spans {
    type Item = (String, Span);
    type IntoIter = std::collections::btree_map::IntoIter<String, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reserved_axes() {
        assert!(is_reserved("bytes"));
        assert!(is_reserved("time"));
        assert!(is_reserved("index"));
        assert!(!is_reserved("record"));
    }

    #[test]
    fn contains_is_half_open() {
        let span = Span::new(3.0, 7.0);
        assert!(span.contains(3.0, false));
        assert!(span.contains(6.0, false));
        assert!(!span.contains(7.0, false));
        assert!(!span.contains(2.0, false));
    }

    #[test]
    fn preceding_contains_is_open_closed() {
        let span = Span::new(3.0, 7.0);
        assert!(!span.contains(3.0, true));
        assert!(span.contains(7.0, true));
        assert!(span.contains(4.0, true));
    }

    #[test]
    fn empty_span_contains_nothing() {
        let span = Span::point(5.0);
        assert!(span.is_empty());
        assert!(!span.contains(5.0, false));
        assert!(!span.contains(5.0, true));
        assert_eq!(span.len(), 0.0);
    }

    #[test]
    fn intersect_overlapping() {
        let a = Span::new(0.0, 10.0);
        let b = Span::new(4.0, 12.0);
        assert_eq!(a.intersect(&b), Span::new(4.0, 10.0));
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Span::new(0.0, 3.0);
        let b = Span::new(5.0, 9.0);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn spans_intersect_keeps_unbounded_axes() {
        let spans = Spans::new()
            .with(BYTES, Span::new(0.0, 10.0))
            .with(TIME, Span::new(1.0, 2.0));
        let bound = Spans::new()
            .with(BYTES, Span::new(3.0, 5.0))
            .with("record", Span::new(0.0, 1.0));
        let result = spans.intersect(&bound);
        assert_eq!(result.get(BYTES), Some(&Span::new(3.0, 5.0)));
        assert_eq!(result.get(TIME), Some(&Span::new(1.0, 2.0)));
        assert!(!result.contains_axis("record"));
    }

    #[test]
    fn extend_hull_widens_both_ends() {
        let mut spans = Spans::new().with(BYTES, Span::new(3.0, 7.0));
        spans.extend_hull(&Spans::new().with(BYTES, Span::new(0.0, 3.0)));
        spans.extend_hull(
            &Spans::new()
                .with(BYTES, Span::new(7.0, 10.0))
                .with(INDEX, Span::new(0.0, 1.0)),
        );
        assert_eq!(spans.get(BYTES), Some(&Span::new(0.0, 10.0)));
        assert_eq!(spans.get(INDEX), Some(&Span::new(0.0, 1.0)));
    }

    #[test]
    fn require_reports_missing_axis() {
        let spans = Spans::new().with(BYTES, Span::new(0.0, 1.0));
        assert_eq!(spans.require(BYTES), Ok(Span::new(0.0, 1.0)));
        assert_eq!(
            spans.require("record"),
            Err(TypeError::MissingAxis("record".into()))
        );
    }

    #[test]
    fn custom_spans_may_not_use_reserved_axes() {
        let ok = Spans::new().with("record", Span::new(0.0, 1.0));
        assert_eq!(ok.ensure_custom(), Ok(()));
        let bad = ok.with(TIME, Span::new(0.0, 1.0));
        assert_eq!(bad.ensure_custom(), Err(TypeError::ReservedAxis("time".into())));
    }

    #[test]
    fn custom_spans_must_be_finite_and_ordered() {
        let nan = Spans::new().with("record", Span::new(f64::NAN, 1.0));
        assert!(matches!(
            nan.ensure_custom(),
            Err(TypeError::InvalidSpan { ref axis, .. }) if axis == "record"
        ));
        let infinite = Spans::new().with("record", Span::new(0.0, f64::INFINITY));
        assert!(matches!(infinite.ensure_custom(), Err(TypeError::InvalidSpan { .. })));
        let reversed = Spans::new().with("record", Span::new(3.0, 1.0));
        assert_eq!(
            reversed.ensure_custom(),
            Err(TypeError::InvalidSpan {
                axis: "record".into(),
                start: 3.0,
                end: 1.0
            })
        );
        assert_eq!(Spans::new().with("record", Span::point(2.0)).ensure_custom(), Ok(()));
    }

    #[test]
    fn serializes_as_axis_object() {
        let spans = Spans::new().with(BYTES, Span::new(0.0, 5.0));
        let json = serde_json::to_value(&spans).unwrap();
        assert_eq!(json, serde_json::json!({"bytes": {"start": 0.0, "end": 5.0}}));
        let parsed: Spans = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, spans);
    }

    proptest! {
        #[test]
        fn intersection_is_within_both(a0 in -1e6f64..1e6, al in 0f64..1e6, b0 in -1e6f64..1e6, bl in 0f64..1e6) {
            let a = Span::new(a0, a0 + al);
            let b = Span::new(b0, b0 + bl);
            let i = a.intersect(&b);
            prop_assert!(i.start <= i.end);
            if !i.is_empty() {
                prop_assert!(i.start >= a.start && i.end <= a.end);
                prop_assert!(i.start >= b.start && i.end <= b.end);
            }
        }
    }
}
