//! Per-invocation render state.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use selkie_layered::graphlib::GraphOptions;
use selkie_layered::{EdgeLabel, LayoutGraph, NodeLabel};
use tracing::error;

use crate::cluster::ClusterRegistry;
use crate::config::LayoutConfig;
use crate::descendants::DescendantIndex;
use crate::model::{GraphInput, ItemFailure, NodeInput};
use crate::self_loop::{PlannedEdge, expand_self_loops};
use crate::{Error, Result};

/// Everything one render call knows about its input. Created fresh for every call and never
/// shared between calls.
#[derive(Debug, Default)]
pub struct RenderContext {
    pub config: LayoutConfig,
    pub descendants: DescendantIndex,
    pub clusters: ClusterRegistry,
    /// Nodes after self-loop expansion, in output order.
    pub nodes: IndexMap<String, NodeInput>,
    /// Edges after self-loop expansion, keyed by edge id, in output order.
    pub edges: IndexMap<String, PlannedEdge>,
    pub synthetic: FxHashSet<String>,
    pub failures: Vec<ItemFailure>,
}

impl RenderContext {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Validates `input`, expands self-loops and builds the compound layout graph.
    pub fn build_graph(&mut self, input: &GraphInput) -> Result<LayoutGraph> {
        self.config.validate()?;
        self.descendants.clear();
        self.clusters.clear();
        self.nodes.clear();
        self.edges.clear();
        self.failures.clear();

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for node in &input.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(Error::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }
        for node in &input.nodes {
            if let Some(parent) = node.parent_id.as_deref() {
                if !seen.contains(parent) {
                    return Err(Error::UnknownParent {
                        node: node.id.clone(),
                        parent: parent.to_string(),
                    });
                }
            }
        }
        check_nesting(&input.nodes, self.config.max_depth)?;
        let mut edge_ids: FxHashSet<&str> = FxHashSet::default();
        for edge in &input.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(Error::DuplicateEdge {
                    id: edge.id.clone(),
                });
            }
            for end in [&edge.start, &edge.end] {
                if !seen.contains(end.as_str()) {
                    return Err(Error::UnknownNode {
                        edge: edge.id.clone(),
                        node: end.clone(),
                    });
                }
            }
        }

        let expansion = expand_self_loops(&input.nodes, &input.edges)?;
        self.synthetic = expansion.synthetic;

        let mut graph = LayoutGraph::new(GraphOptions::compound_multigraph());
        graph.set_graph(self.config.graph_label());

        for node in expansion.nodes {
            if self.nodes.contains_key(&node.id) {
                return Err(Error::DuplicateNode { id: node.id });
            }
            graph.set_node(node.id.clone(), NodeLabel::default());
            self.nodes.insert(node.id.clone(), node);
        }
        for node in self.nodes.values() {
            if let Some(parent) = &node.parent_id {
                graph.set_parent(node.id.clone(), parent.clone());
            }
        }

        for planned in expansion.edges {
            let id = planned.input.id.clone();
            if self.edges.contains_key(&id) {
                return Err(Error::DuplicateEdge { id });
            }
            let mut label = EdgeLabel::default();
            label.set_extra_str("id", id.as_str());
            if let Some(cluster) = &planned.from_cluster {
                label.set_extra_str("fromCluster", cluster.as_str());
            }
            if let Some(cluster) = &planned.to_cluster {
                label.set_extra_str("toCluster", cluster.as_str());
            }
            graph.set_edge_named(
                planned.input.start.clone(),
                planned.input.end.clone(),
                Some(planned.name.clone()),
                Some(label),
            );
            self.edges.insert(id, planned);
        }

        Ok(graph)
    }

    pub fn is_synthetic(&self, id: &str) -> bool {
        self.synthetic.contains(id)
    }

    /// Nesting depth of `id` in the input hierarchy; top-level nodes are at depth 0.
    pub fn depth_of(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        while let Some(parent) = cur {
            depth += 1;
            if depth > self.nodes.len() {
                break;
            }
            cur = self.nodes.get(parent).and_then(|n| n.parent_id.as_deref());
        }
        depth
    }
}

/// Rejects parent cycles and any node nested more than `max_depth` levels deep, before the
/// hierarchy is walked by anything else.
fn check_nesting(nodes: &[NodeInput], max_depth: usize) -> Result<()> {
    let parents: FxHashMap<&str, &str> = nodes
        .iter()
        .filter_map(|n| n.parent_id.as_deref().map(|p| (n.id.as_str(), p)))
        .collect();
    let mut depths: FxHashMap<&str, usize> = FxHashMap::default();

    for node in nodes {
        let mut chain: Vec<&str> = Vec::new();
        let mut on_chain: FxHashSet<&str> = FxHashSet::default();
        let mut cur = node.id.as_str();
        let mut depth = loop {
            if let Some(&known) = depths.get(cur) {
                break known;
            }
            if !on_chain.insert(cur) {
                return Err(Error::ParentCycle {
                    node: cur.to_string(),
                });
            }
            match parents.get(cur) {
                Some(&parent) => {
                    chain.push(cur);
                    cur = parent;
                }
                None => {
                    depths.insert(cur, 0);
                    break 0;
                }
            }
        };

        while let Some(id) = chain.pop() {
            depth += 1;
            if depth > max_depth {
                let cluster = parents.get(id).copied().unwrap_or(id);
                error!(cluster, node = id, limit = max_depth, "graph too deeply nested");
                return Err(Error::DepthExceeded {
                    cluster: cluster.to_string(),
                    limit: max_depth,
                });
            }
            depths.insert(id, depth);
        }
    }
    Ok(())
}
