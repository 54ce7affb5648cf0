//! Descent from a root to the node covering an offset.

use std::sync::Arc;

use tracing::debug;

use skein_types::{Spans, BYTES};

use crate::cache::NodeCache;
use crate::error::{TreeError, TreeResult};
use crate::node::Node;

/// Result of [`locate`].
///
/// `bound` is the node's own spans intersected with every bound inherited
/// on the way down: the extent over which the node's chunk is still the
/// live data of the stream. It is returned by value; cached nodes are
/// never annotated.
#[derive(Clone, Debug)]
pub struct Located {
    pub node: Arc<Node>,
    pub bound: Spans,
}

/// Find the node whose own chunk covers `offset` on `axis`, starting at
/// `root`.
///
/// At each node the own chunk is checked first, then the lookup list in
/// order; the first entry whose bound-intersected span covers `offset`
/// is followed. With `preceding`, spans are treated as `(start, end]`,
/// selecting the chunk that ends at `offset`.
pub async fn locate(
    cache: &NodeCache,
    root: Arc<Node>,
    axis: &str,
    offset: f64,
    inherited: Option<Spans>,
    preceding: bool,
) -> TreeResult<Located> {
    let mut node = root;
    let mut bound = inherited;
    loop {
        let own = bounded(node.own_spans(), bound.as_ref());
        if covers(&own, axis, offset, preceding) {
            return Ok(Located { node, bound: own });
        }

        let next = node.lookup().iter().find_map(|entry| {
            let spans = bounded(&entry.spans, bound.as_ref());
            covers(&spans, axis, offset, preceding).then(|| (entry.identifiers.clone(), spans))
        });
        let Some((identifiers, spans)) = next else {
            return Err(TreeError::OutOfRange {
                axis: axis.to_string(),
                offset,
            });
        };
        debug!(axis, offset, node = %identifiers.label(), "descending");
        node = cache.resolve(&identifiers).await?;
        bound = Some(spans);
    }
}

/// Reject `bytes` offsets that do not name a whole byte. Other axes are
/// not checked.
pub fn ensure_whole_byte(axis: &str, offset: f64) -> TreeResult<()> {
    if axis == BYTES && (!offset.is_finite() || offset.fract() != 0.0) {
        return Err(TreeError::FractionalOffset { offset });
    }
    Ok(())
}

fn bounded(spans: &Spans, bound: Option<&Spans>) -> Spans {
    match bound {
        Some(bound) => spans.intersect(bound),
        None => spans.clone(),
    }
}

fn covers(spans: &Spans, axis: &str, offset: f64, preceding: bool) -> bool {
    spans
        .get(axis)
        .is_some_and(|span| span.contains(offset, preceding))
}
