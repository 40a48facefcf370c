//! Layout label types and a basic layered layout engine.
//!
//! The engine is intentionally small: DFS cycle breaking, longest-path ranking, in-order
//! placement per rank, padded compound boxes and straight clipped edges. It is good enough to
//! drive `selkie-render` headlessly and in tests; anything that needs crossing minimisation or
//! balanced coordinates should plug a different engine in through `selkie-render`'s
//! `LayoutEngine` trait.

#![forbid(unsafe_code)]

pub use selkie_graphlib as graphlib;

mod acyclic;
mod model;
mod position;
mod rank;
mod route;
pub mod util;

pub use model::{EdgeLabel, GraphLabel, NodeLabel, Point, RankDir, Rect};

use rustc_hash::FxHashMap;
use selkie_graphlib::{Graph, alg};
use tracing::debug;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The graph type every layout pass operates on.
pub type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("node `{node}` has an invalid size {width}x{height}")]
    InvalidNodeSize { node: String, width: f64, height: f64 },
    #[error("node `{node}` was not assigned a position")]
    Unpositioned { node: String },
}

/// Unit handle for the built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredLayout;

impl LayeredLayout {
    pub fn run(&self, g: &mut LayoutGraph) -> Result<(), LayoutError> {
        layout(g)
    }
}

/// Lays out `g` in place.
///
/// Leaf nodes (nodes without children) get `x`/`y` centers, `rank` and `order`. Compound nodes
/// get the padded box of their children. Every edge gets `points` and a label center. The graph
/// label receives the overall `width`/`height`.
pub fn layout(g: &mut LayoutGraph) -> Result<(), LayoutError> {
    for id in g.nodes() {
        let Some(n) = g.node(id) else { continue };
        if !(n.width.is_finite() && n.height.is_finite()) || n.width < 0.0 || n.height < 0.0 {
            return Err(LayoutError::InvalidNodeSize {
                node: id.to_string(),
                width: n.width,
                height: n.height,
            });
        }
    }

    // Hierarchy order keeps members of a cluster next to each other within a rank.
    let leaves: Vec<String> = alg::hierarchy_order(g)
        .into_iter()
        .filter(|id| !g.has_children(id))
        .collect();
    let index: FxHashMap<&str, usize> = leaves
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut rank_edges: Vec<rank::RankEdge> = Vec::new();
    let mut rank_keys = Vec::new();
    for (key, label) in g.edge_entries() {
        let (Some(&v), Some(&w)) = (index.get(key.v.as_str()), index.get(key.w.as_str())) else {
            continue;
        };
        if v == w {
            continue;
        }
        rank_edges.push(rank::RankEdge {
            v,
            w,
            minlen: label.minlen,
        });
        rank_keys.push(key.clone());
    }

    let reversed = acyclic::dfs_feedback_edges(leaves.len(), &rank_edges);
    let ranks = rank::longest_path(leaves.len(), &rank_edges, &reversed);
    for (key, flag) in rank_keys.iter().zip(&reversed) {
        if let Some(label) = g.edge_mut_by_key(key) {
            label.reversed = *flag;
        }
    }

    position::place_leaves(g, &leaves, &ranks)?;
    position::size_compounds(g);
    position::translate(g);
    route::route_edges(g);

    debug!(
        nodes = g.node_count(),
        edges = g.edge_count(),
        width = g.graph().width,
        height = g.graph().height,
        "layered layout finished"
    );
    Ok(())
}
