//! Cluster bookkeeping: one record per cluster, its representative node and whether it has
//! edges crossing its boundary.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use selkie_layered::LayoutGraph;

use crate::config::Direction;
use crate::model::NodeInput;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterData {
    pub label: Option<String>,
    pub dir: Option<Direction>,
    pub padding: Option<f64>,
}

impl From<&NodeInput> for ClusterData {
    fn from(node: &NodeInput) -> Self {
        Self {
            label: node.label.clone(),
            dir: node.dir,
            padding: node.padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub id: String,
    /// Node that stands in for the cluster when edges are redirected. Either a descendant of
    /// the cluster or the cluster itself.
    pub representative: String,
    pub external_connections: bool,
    pub data: ClusterData,
}

#[derive(Debug, Default, Clone)]
pub struct ClusterRegistry {
    records: IndexMap<String, ClusterRecord>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn insert(&mut self, record: ClusterRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&ClusterRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ClusterRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClusterRecord> {
        self.records.values()
    }

    pub fn has_external_connections(&self, id: &str) -> bool {
        self.records
            .get(id)
            .is_some_and(|r| r.external_connections)
    }

    /// No-op for ids that are not registered clusters.
    pub fn mark_external(&mut self, id: &str) {
        if let Some(record) = self.records.get_mut(id) {
            record.external_connections = true;
        }
    }

    /// Endpoint an edge touching `id` should use: the representative of an externally
    /// connected cluster, `id` itself otherwise.
    pub fn anchor_id(&self, id: &str) -> String {
        match self.records.get(id) {
            Some(record) if record.external_connections => record.representative.clone(),
            _ => id.to_string(),
        }
    }
}

/// Edges of `cluster_id` that `candidate` already has, with the cluster endpoint rewritten to
/// the candidate.
pub fn find_common_edges(graph: &LayoutGraph, cluster_id: &str, candidate: &str) -> Vec<(String, String)> {
    let rewrite = |end: &str| {
        if end == cluster_id {
            candidate.to_string()
        } else {
            end.to_string()
        }
    };
    let own: FxHashSet<(String, String)> = graph
        .node_edges(candidate)
        .into_iter()
        .map(|k| (k.v, k.w))
        .collect();
    graph
        .node_edges(cluster_id)
        .into_iter()
        .map(|k| (rewrite(&k.v), rewrite(&k.w)))
        .filter(|pair| own.contains(pair))
        .collect()
}

/// Picks the leaf that should stand in for `cluster_id`.
///
/// Walks children depth first and returns the first leaf that would not duplicate one of the
/// cluster's edges if those edges were redirected to it. A leaf at the far end of one of those
/// edges is skipped too, since redirecting would turn the edge into a self-loop. Returns `None`
/// when no leaf qualifies, in which case the cluster anchors its own edges.
pub fn find_representative(graph: &LayoutGraph, cluster_id: &str) -> Option<String> {
    let partners: FxHashSet<String> = graph
        .node_edges(cluster_id)
        .into_iter()
        .flat_map(|k| [k.v, k.w])
        .filter(|end| end != cluster_id)
        .collect();

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    seen.insert(cluster_id);
    let mut stack: Vec<&str> = graph.children(cluster_id).into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        // Parent cycles would revisit nodes.
        if !seen.insert(id) {
            continue;
        }
        let children = graph.children(id);
        if children.is_empty() {
            if !partners.contains(id) && find_common_edges(graph, cluster_id, id).is_empty() {
                return Some(id.to_string());
            }
            continue;
        }
        stack.extend(children.into_iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use selkie_layered::graphlib::GraphOptions;
    use selkie_layered::{EdgeLabel, NodeLabel};

    fn graph() -> LayoutGraph {
        let mut g = LayoutGraph::new(GraphOptions::compound_multigraph());
        for id in ["C", "a", "b", "x"] {
            g.set_node(id, NodeLabel::default());
        }
        g.set_parent("a", "C");
        g.set_parent("b", "C");
        g
    }

    #[test]
    fn first_leaf_represents_the_cluster() {
        let mut g = graph();
        g.set_edge_with_label("x", "C", EdgeLabel::default());
        assert_eq!(find_representative(&g, "C").as_deref(), Some("a"));
    }

    #[test]
    fn leaves_with_duplicate_edges_are_skipped() {
        let mut g = graph();
        g.set_edge_with_label("x", "C", EdgeLabel::default());
        g.set_edge_with_label("x", "a", EdgeLabel::default());
        assert_eq!(find_common_edges(&g, "C", "a"), vec![("x".to_string(), "a".to_string())]);
        assert_eq!(find_representative(&g, "C").as_deref(), Some("b"));
    }

    #[test]
    fn no_unambiguous_leaf_yields_none() {
        let mut g = graph();
        g.set_edge_with_label("x", "C", EdgeLabel::default());
        g.set_edge_with_label("x", "a", EdgeLabel::default());
        g.set_edge_with_label("x", "b", EdgeLabel::default());
        assert_eq!(find_representative(&g, "C"), None);
    }

    #[test]
    fn member_linked_to_its_own_cluster_is_not_chosen() {
        let mut g = graph();
        g.set_edge_with_label("a", "C", EdgeLabel::default());
        assert!(find_common_edges(&g, "C", "a").is_empty());
        assert_eq!(find_representative(&g, "C").as_deref(), Some("b"));

        g.set_edge_with_label("C", "b", EdgeLabel::default());
        assert_eq!(find_representative(&g, "C"), None);
    }

    #[test]
    fn anchor_depends_on_external_connections() {
        let mut reg = ClusterRegistry::new();
        reg.insert(ClusterRecord {
            id: "C".into(),
            representative: "a".into(),
            external_connections: false,
            data: ClusterData::default(),
        });
        assert_eq!(reg.anchor_id("C"), "C");
        reg.mark_external("C");
        assert_eq!(reg.anchor_id("C"), "a");
        assert_eq!(reg.anchor_id("other"), "other");
        reg.mark_external("other");
        assert_eq!(reg.len(), 1);
    }
}
