//! Coordinate assignment.
//!
//! Placement happens in a top-to-bottom frame: ranks are rows, nodes of a rank are laid out left
//! to right in the given order. The rank direction is applied afterwards by swapping/mirroring
//! axes, so node sizes are swapped up front for horizontal layouts.

use crate::model::{Rect, RankDir};
use crate::{LayoutError, LayoutGraph};
use rustc_hash::FxHashMap;
use selkie_graphlib::alg;

pub(crate) fn place_leaves(
    g: &mut LayoutGraph,
    leaves: &[String],
    ranks: &[i32],
) -> Result<(), LayoutError> {
    let label = g.graph().clone();
    let horizontal = label.rankdir.is_horizontal();

    let max_rank = ranks.iter().copied().max().unwrap_or(0).max(0) as usize;
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    for (ix, &r) in ranks.iter().enumerate() {
        layers[r.max(0) as usize].push(ix);
    }

    // Frame-local size: (extent within the rank, extent along the rank axis).
    let size_of = |g: &LayoutGraph, id: &str| -> (f64, f64) {
        let n = g.node(id).cloned().unwrap_or_default();
        if horizontal {
            (n.height, n.width)
        } else {
            (n.width, n.height)
        }
    };

    let mut frame_pos: FxHashMap<usize, (f64, f64)> = FxHashMap::default();
    let mut rank_top = 0.0;
    for (rank, layer) in layers.iter().enumerate() {
        let thickness = layer
            .iter()
            .map(|&ix| size_of(g, &leaves[ix]).1)
            .fold(0.0_f64, f64::max);

        let mut cursor = 0.0;
        let mut xs: Vec<(usize, f64)> = Vec::with_capacity(layer.len());
        let mut prev: Option<&str> = None;
        for (order, &ix) in layer.iter().enumerate() {
            let id = leaves[ix].as_str();
            let (w, _) = size_of(g, id);
            if let Some(prev) = prev {
                cursor += label.nodesep + cluster_gap(g, prev, id) * label.cluster_padding * 2.0;
            }
            xs.push((ix, cursor + w / 2.0));
            cursor += w;
            prev = Some(id);

            if let Some(n) = g.node_mut(id) {
                n.rank = Some(rank as i32);
                n.order = Some(order);
            }
        }

        let shift = cursor / 2.0;
        let y = rank_top + thickness / 2.0;
        for (ix, x) in xs {
            frame_pos.insert(ix, (x - shift, y));
        }
        rank_top += thickness + label.ranksep;
    }

    for (ix, id) in leaves.iter().enumerate() {
        let Some(&(fx, fy)) = frame_pos.get(&ix) else {
            return Err(LayoutError::Unpositioned { node: id.clone() });
        };
        let (x, y) = match label.rankdir {
            RankDir::TB => (fx, fy),
            RankDir::BT => (fx, -fy),
            RankDir::LR => (fy, fx),
            RankDir::RL => (-fy, fx),
        };
        if let Some(n) = g.node_mut(id) {
            n.x = Some(x);
            n.y = Some(y);
        }
    }
    Ok(())
}

/// Number of cluster borders crossed between two neighbours of the same rank.
fn cluster_gap(g: &LayoutGraph, a: &str, b: &str) -> f64 {
    if g.parent(a) == g.parent(b) {
        return 0.0;
    }
    let common = alg::lowest_common_parent(g, a, b);
    let common_depth = common.as_deref().map(|c| alg::depth(g, c) + 1).unwrap_or(0);
    let da = alg::depth(g, a).saturating_sub(common_depth);
    let db = alg::depth(g, b).saturating_sub(common_depth);
    (da + db) as f64
}

/// Sizes every compound node to the padded union of its children, innermost first.
pub(crate) fn size_compounds(g: &mut LayoutGraph) {
    let padding = g.graph().cluster_padding;
    let mut order = alg::hierarchy_order(g);
    order.reverse();

    for id in order {
        if !g.has_children(&id) {
            continue;
        }
        let rect = g
            .children(&id)
            .into_iter()
            .filter_map(|c| g.node(c).and_then(|n| n.rect()))
            .reduce(|acc, r| acc.union(&r));
        let Some(rect) = rect else {
            continue;
        };
        let rect = rect.pad(padding, padding);
        if let Some(n) = g.node_mut(&id) {
            n.x = Some(rect.x);
            n.y = Some(rect.y);
            n.width = rect.width;
            n.height = rect.height;
        }
    }
}

/// Moves the drawing so its top-left corner sits at the configured margins.
pub(crate) fn translate(g: &mut LayoutGraph) {
    let bounds = g
        .nodes()
        .filter_map(|id| g.node(id).and_then(|n| n.rect()))
        .reduce(|acc, r| acc.union(&r))
        .unwrap_or(Rect::from_center(0.0, 0.0, 0.0, 0.0));

    let marginx = g.graph().marginx;
    let marginy = g.graph().marginy;
    let dx = marginx - bounds.min_x();
    let dy = marginy - bounds.min_y();

    for id in g.node_ids() {
        if let Some(n) = g.node_mut(&id) {
            if let (Some(x), Some(y)) = (n.x, n.y) {
                n.x = Some(x + dx);
                n.y = Some(y + dy);
            }
        }
    }

    let label = g.graph_mut();
    label.width = bounds.width + 2.0 * marginx;
    label.height = bounds.height + 2.0 * marginy;
}
