//! Cluster adjustment.
//!
//! Edges that cross a cluster boundary are re-anchored to the cluster's representative, and
//! every cluster without external connections is moved out of its graph into a sub-graph of its
//! own, leaving a placeholder node behind. The result is a tree of [`PreparedGraph`]s that the
//! renderer lays out bottom-up.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use selkie_layered::graphlib::{EdgeKey, GraphOptions};
use selkie_layered::{LayoutGraph, NodeLabel};
use tracing::{debug, error, trace, warn};

use crate::cluster::{ClusterData, ClusterRecord, find_representative};
use crate::config::Direction;
use crate::context::RenderContext;
use crate::{Error, Result};

/// One level of the flattened graph.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    pub graph: LayoutGraph,
    /// Sub-graphs of the collapsed clusters of this level, keyed by placeholder id.
    pub extracted: BTreeMap<String, PreparedGraph>,
    /// The cluster this graph was extracted from; `None` for the top level.
    pub root_cluster_id: Option<String>,
    pub depth: usize,
    pub copy_failures: Vec<EdgeCopyError>,
}

impl PreparedGraph {
    fn new(graph: LayoutGraph, root_cluster_id: Option<String>, depth: usize) -> Self {
        Self {
            graph,
            extracted: BTreeMap::new(),
            root_cluster_id,
            depth,
            copy_failures: Vec::new(),
        }
    }

    /// Finds the sub-graph extracted for `cluster_id` anywhere below this level.
    pub fn find(&self, cluster_id: &str) -> Option<&PreparedGraph> {
        if let Some(found) = self.extracted.get(cluster_id) {
            return Some(found);
        }
        self.extracted.values().find_map(|sub| sub.find(cluster_id))
    }

    /// Number of levels in this tree, including this one.
    pub fn level_count(&self) -> usize {
        1 + self
            .extracted
            .values()
            .map(PreparedGraph::level_count)
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("edge {edge} could not be copied into cluster `{cluster}`: {reason}")]
pub struct EdgeCopyError {
    pub edge: String,
    pub cluster: String,
    pub reason: String,
}

/// Flattens `graph` into a tree of prepared levels. A graph without clusters comes back
/// unchanged as a single level.
pub fn adjust_clusters_and_edges(mut graph: LayoutGraph, ctx: &mut RenderContext) -> Result<PreparedGraph> {
    let cluster_ids: Vec<String> = graph
        .node_ids()
        .into_iter()
        .filter(|id| graph.has_children(id))
        .collect();
    if cluster_ids.is_empty() {
        debug!("graph has no clusters, nothing to adjust");
        return Ok(PreparedGraph::new(graph, None, 0));
    }

    ctx.descendants.clear();
    ctx.clusters.clear();
    register_clusters(&graph, &cluster_ids, ctx)?;
    classify_external_connections(&graph, ctx);
    hoist_representatives(&graph, ctx)?;
    rewrite_cluster_edges(&mut graph, ctx);
    debug!(
        clusters = ctx.clusters.len(),
        external = ctx.clusters.iter().filter(|c| c.external_connections).count(),
        "clusters adjusted"
    );
    extract_clusters(graph, ctx, 0, None)
}

fn register_clusters(graph: &LayoutGraph, cluster_ids: &[String], ctx: &mut RenderContext) -> Result<()> {
    ctx.descendants.rebuild(graph)?;
    for id in cluster_ids {
        let representative = find_representative(graph, id).unwrap_or_else(|| {
            warn!(cluster = %id, "no unambiguous representative, anchoring edges to the cluster itself");
            id.clone()
        });
        let data = ctx.nodes.get(id).map(ClusterData::from).unwrap_or_default();
        trace!(cluster = %id, representative = %representative, "registered cluster");
        ctx.clusters.insert(ClusterRecord {
            id: id.clone(),
            representative,
            external_connections: false,
            data,
        });
    }
    Ok(())
}

fn classify_external_connections(graph: &LayoutGraph, ctx: &mut RenderContext) {
    let ids: Vec<String> = ctx.clusters.ids().map(str::to_string).collect();
    for id in ids {
        let crossing = graph.edges().find(|key| {
            ctx.descendants.is_descendant(&key.v, &id) != ctx.descendants.is_descendant(&key.w, &id)
        });
        if let Some(key) = crossing {
            trace!(cluster = %id, edge = %key, "cluster has external connections");
            ctx.clusters.mark_external(&id);
        }
    }
}

/// Moves each representative up into the enclosing cluster while that cluster is going to be
/// collapsed, since its contents will not be visible at this level.
fn hoist_representatives(graph: &LayoutGraph, ctx: &mut RenderContext) -> Result<()> {
    let limit = ctx.config.max_depth;
    let ids: Vec<String> = ctx.clusters.ids().map(str::to_string).collect();
    let mut passes = 0;
    loop {
        let mut last_changed: Option<String> = None;
        for id in &ids {
            let Some(rep) = ctx.clusters.get(id).map(|r| r.representative.clone()) else {
                continue;
            };
            let Some(parent) = graph.parent(&rep) else {
                continue;
            };
            if parent == id
                || !ctx.descendants.is_descendant(parent, id)
                || !ctx.clusters.contains(parent)
                || ctx.clusters.has_external_connections(parent)
            {
                continue;
            }
            trace!(cluster = %id, from = %rep, to = parent, "hoisting representative");
            let parent = parent.to_string();
            if let Some(record) = ctx.clusters.get_mut(id) {
                record.representative = parent;
            }
            last_changed = Some(id.clone());
        }

        let Some(cluster) = last_changed else {
            return Ok(());
        };
        passes += 1;
        if passes > limit {
            error!(cluster = %cluster, limit, "representative hoisting did not settle");
            return Err(Error::DepthExceeded { cluster, limit });
        }
    }
}

fn rewrite_cluster_edges(graph: &mut LayoutGraph, ctx: &mut RenderContext) {
    for key in graph.edge_keys() {
        if !ctx.clusters.contains(&key.v) && !ctx.clusters.contains(&key.w) {
            continue;
        }
        let Some(mut label) = graph.take_edge(&key) else {
            continue;
        };
        let v = ctx.clusters.anchor_id(&key.v);
        let w = ctx.clusters.anchor_id(&key.w);
        if v != key.v {
            mark_crossed(graph, ctx, &v, &key.v);
            label.set_extra_str("fromCluster", key.v.as_str());
        }
        if w != key.w {
            mark_crossed(graph, ctx, &w, &key.w);
            label.set_extra_str("toCluster", key.w.as_str());
        }
        trace!(edge = %key, v = %v, w = %w, "re-anchored cluster edge");
        graph.set_edge_named(v, w, key.name.clone(), Some(label));
    }
}

/// Marks every cluster between `anchor` and `cluster` as crossed by an edge.
fn mark_crossed(graph: &LayoutGraph, ctx: &mut RenderContext, anchor: &str, cluster: &str) {
    for ancestor in graph.ancestors(anchor) {
        if ancestor == cluster {
            break;
        }
        ctx.clusters.mark_external(ancestor);
    }
}

fn extract_clusters(
    mut graph: LayoutGraph,
    ctx: &mut RenderContext,
    depth: usize,
    root_cluster_id: Option<String>,
) -> Result<PreparedGraph> {
    // Outermost first: a nested cluster moves along with its parent and is handled one
    // level down.
    let mut candidates: Vec<(usize, String)> = graph
        .nodes()
        .filter(|id| {
            graph.has_children(id)
                && ctx.clusters.contains(id)
                && !ctx.clusters.has_external_connections(id)
        })
        .map(|id| (graph.ancestors(id).len(), id.to_string()))
        .collect();
    if candidates.is_empty() {
        return Ok(PreparedGraph::new(graph, root_cluster_id, depth));
    }
    if depth >= ctx.config.max_depth {
        let cluster = candidates[0].1.clone();
        error!(cluster = %cluster, limit = ctx.config.max_depth, "graph too deeply nested");
        return Err(Error::DepthExceeded {
            cluster,
            limit: ctx.config.max_depth,
        });
    }
    candidates.sort_by_key(|(d, _)| *d);

    let parent_dir = Direction::from_rank_dir(graph.graph().rankdir);
    let mut pulled: Vec<(String, LayoutGraph, Vec<EdgeCopyError>)> = Vec::new();
    for (_, id) in candidates {
        if !graph.has_node(&id) || !graph.has_children(&id) {
            continue;
        }
        let dir = ctx
            .clusters
            .get(&id)
            .and_then(|r| r.data.dir)
            .unwrap_or_else(|| parent_dir.toggled());
        let Some(members) = ctx.descendants.members(&id) else {
            return Err(Error::Inconsistent {
                message: format!("cluster `{id}` has no descendant set"),
            });
        };

        let mut sub = LayoutGraph::new(GraphOptions::compound_multigraph());
        sub.set_graph(ctx.config.graph_label_for(dir));
        let mut failures = Vec::new();
        copy_cluster(&mut graph, &mut sub, &id, members, &mut failures);
        graph.set_node(id.clone(), NodeLabel::default());
        debug!(
            cluster = %id,
            depth,
            nodes = sub.node_count(),
            edges = sub.edge_count(),
            dir = ?dir,
            "extracted cluster"
        );
        pulled.push((id, sub, failures));
    }

    let mut prepared = PreparedGraph::new(graph, root_cluster_id, depth);
    for (id, sub, failures) in pulled {
        let mut child = extract_clusters(sub, ctx, depth + 1, Some(id.clone()))?;
        child.copy_failures.extend(failures);
        prepared.extracted.insert(id, child);
    }
    Ok(prepared)
}

/// Moves the subtree of `root_id` from `graph` into `sub`.
///
/// Nodes are moved in post-order, so by the time a nested cluster is visited its children are
/// gone and it is copied like a leaf, keeping its own edges.
fn copy_cluster(
    graph: &mut LayoutGraph,
    sub: &mut LayoutGraph,
    root_id: &str,
    members: &FxHashSet<String>,
    failures: &mut Vec<EdgeCopyError>,
) {
    for node in subtree_post_order(graph, root_id) {
        if !graph.has_node(&node) {
            continue;
        }

        let label = graph.node(&node).cloned().unwrap_or_default();
        sub.set_node(node.clone(), label);
        if let Some(parent) = graph.parent(&node) {
            if parent != root_id {
                sub.set_parent(node.clone(), parent.to_string());
            }
        }
        for key in graph.node_edges(&node) {
            match copy_edge(graph, sub, &key, root_id, members) {
                Ok(true) => trace!(edge = %key, cluster = root_id, "copied edge"),
                Ok(false) => {}
                Err(err) => failures.push(err),
            }
        }
        graph.remove_node(&node);
    }
}

/// Descendants of `root_id`, children before the node that contains them. `root_id` itself is
/// not included.
fn subtree_post_order(graph: &LayoutGraph, root_id: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    seen.insert(root_id);
    let mut stack: Vec<(&str, bool)> = graph
        .children(root_id)
        .into_iter()
        .rev()
        .map(|child| (child, false))
        .collect();
    while let Some((id, finished)) = stack.pop() {
        if finished {
            out.push(id.to_string());
            continue;
        }
        if !seen.insert(id) {
            continue;
        }
        stack.push((id, true));
        stack.extend(graph.children(id).into_iter().rev().map(|child| (child, false)));
    }
    out
}

fn copy_edge(
    graph: &LayoutGraph,
    sub: &mut LayoutGraph,
    key: &EdgeKey,
    root_id: &str,
    members: &FxHashSet<String>,
) -> std::result::Result<bool, EdgeCopyError> {
    if key.touches(root_id) {
        return Ok(false);
    }
    let failure = |reason: &str| EdgeCopyError {
        edge: key.to_string(),
        cluster: root_id.to_string(),
        reason: reason.to_string(),
    };
    match (members.contains(&key.v), members.contains(&key.w)) {
        (true, true) => {}
        (false, false) => return Ok(false),
        _ => return Err(failure("edge crosses the boundary of a collapsed cluster")),
    }
    if sub.has_edge(&key.v, &key.w, key.name.as_deref()) {
        return Ok(false);
    }
    let label = graph
        .edge_by_key(key)
        .cloned()
        .ok_or_else(|| failure("edge label is missing"))?;
    sub.set_edge_key(key.clone(), label);
    Ok(true)
}
