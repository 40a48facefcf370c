//! Self-loop expansion.
//!
//! The layout engine cannot draw an edge from a node to itself, so every `X -> X` edge becomes
//! `X -> X---X---1 -> X---X---2 -> X` through two zero-size nodes living next to `X`.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::trace;

use crate::model::{EdgeInput, NodeInput};
use crate::{Error, Result};

/// An edge ready to be inserted into the layout graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEdge {
    pub input: EdgeInput,
    /// Multigraph edge name.
    pub name: String,
    pub from_cluster: Option<String>,
    pub to_cluster: Option<String>,
}

impl PlannedEdge {
    fn plain(input: EdgeInput) -> Self {
        Self {
            name: input.id.clone(),
            input,
            from_cluster: None,
            to_cluster: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub nodes: Vec<NodeInput>,
    pub edges: Vec<PlannedEdge>,
    pub synthetic: FxHashSet<String>,
}

fn no_arrow(mut edge: EdgeInput) -> EdgeInput {
    edge.label = None;
    edge.arrow_type_start = Some("none".to_string());
    edge.arrow_type_end = Some("none".to_string());
    edge
}

fn synthetic_node(id: String, looped: &NodeInput) -> NodeInput {
    NodeInput {
        id,
        parent_id: looped.parent_id.clone(),
        label: Some(String::new()),
        width: Some(0.0),
        height: Some(0.0),
        shape: Some("labelRect".to_string()),
        padding: Some(0.0),
        ..Default::default()
    }
}

/// Replaces every self-loop in `edges` with its three-segment detour.
///
/// Node order is kept, with the synthetic nodes of a loop placed right after the node it loops
/// on. Edge order is kept, with each loop's three segments in place of the loop.
pub fn expand_self_loops(nodes: &[NodeInput], edges: &[EdgeInput]) -> Result<Expansion> {
    let by_id: FxHashMap<&str, &NodeInput> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let groups: FxHashSet<&str> = nodes.iter().filter_map(|n| n.parent_id.as_deref()).collect();

    let mut loops_per_node: FxHashMap<&str, usize> = FxHashMap::default();
    let mut extra_nodes: FxHashMap<&str, Vec<NodeInput>> = FxHashMap::default();
    let mut out = Expansion::default();

    for edge in edges {
        if !edge.is_self_loop() {
            out.edges.push(PlannedEdge::plain(edge.clone()));
            continue;
        }
        let x = edge.start.as_str();
        let Some(&looped) = by_id.get(x) else {
            return Err(Error::UnknownNode {
                edge: edge.id.clone(),
                node: x.to_string(),
            });
        };

        let seen = loops_per_node.entry(x).or_insert(0);
        *seen += 1;
        let suffix = if *seen == 1 {
            String::new()
        } else {
            format!("-{seen}")
        };

        let first = format!("{x}---{x}---1{suffix}");
        let second = format!("{x}---{x}---2{suffix}");
        let slot = extra_nodes.entry(x).or_default();
        slot.push(synthetic_node(first.clone(), looped));
        slot.push(synthetic_node(second.clone(), looped));
        out.synthetic.insert(first.clone());
        out.synthetic.insert(second.clone());

        let cluster = groups.contains(x).then(|| x.to_string());
        let mut tagged = edge.clone();
        tagged
            .extra
            .insert("selfLoopOf".to_string(), Value::String(edge.id.clone()));

        let mut head = no_arrow(tagged.clone());
        head.id = format!("{x}-cyclic-special-1{suffix}");
        head.end = first.clone();
        let mut mid = tagged.clone();
        mid.id = format!("{x}-cyclic-special-mid{suffix}");
        mid.start = first.clone();
        mid.end = second.clone();
        let mut tail = no_arrow(tagged);
        tail.id = format!("{x}-cyclic-special-2{suffix}");
        tail.start = second;

        trace!(node = x, edge = %edge.id, "expanding self-loop");
        out.edges.push(PlannedEdge {
            name: format!("{}-cyclic-special-0", edge.id),
            input: head,
            from_cluster: cluster.clone(),
            to_cluster: None,
        });
        out.edges.push(PlannedEdge {
            name: format!("{}-cyclic-special-1", edge.id),
            input: mid,
            from_cluster: None,
            to_cluster: None,
        });
        out.edges.push(PlannedEdge {
            name: format!("{}-cyclic-special-2", edge.id),
            input: tail,
            from_cluster: None,
            to_cluster: cluster,
        });
    }

    for node in nodes {
        out.nodes.push(node.clone());
        if let Some(extra) = extra_nodes.remove(node.id.as_str()) {
            out.nodes.extend(extra);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<T>(items: &[T], f: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|i| f(i).to_string()).collect()
    }

    #[test]
    fn loop_becomes_three_segments() {
        let nodes = vec![NodeInput::new("A"), NodeInput::new("B")];
        let edges = vec![
            EdgeInput::new("e0", "A", "B"),
            EdgeInput::new("loop", "A", "A").with_label("again"),
        ];
        let out = expand_self_loops(&nodes, &edges).unwrap();

        assert_eq!(ids(&out.nodes, |n| n.id.as_str()), ["A", "A---A---1", "A---A---2", "B"]);
        let pairs: Vec<(&str, &str)> = out
            .edges
            .iter()
            .map(|e| (e.input.start.as_str(), e.input.end.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("A", "B"),
                ("A", "A---A---1"),
                ("A---A---1", "A---A---2"),
                ("A---A---2", "A"),
            ]
        );
        assert_eq!(
            ids(&out.edges[1..], |e| e.input.id.as_str()),
            ["A-cyclic-special-1", "A-cyclic-special-mid", "A-cyclic-special-2"]
        );
        assert_eq!(
            ids(&out.edges[1..], |e| e.name.as_str()),
            ["loop-cyclic-special-0", "loop-cyclic-special-1", "loop-cyclic-special-2"]
        );

        let with_arrow = out.edges[1..]
            .iter()
            .filter(|e| e.input.arrow_type_end.as_deref() != Some("none"))
            .count();
        assert_eq!(with_arrow, 1);
        assert_eq!(out.edges[2].input.label.as_deref(), Some("again"));
        assert_eq!(out.edges[1].input.label, None);
        assert!(out.synthetic.contains("A---A---2"));
    }

    #[test]
    fn synthetic_nodes_inherit_parent_and_clusters_are_tagged() {
        let nodes = vec![
            NodeInput::new("G"),
            NodeInput::new("a").with_parent("G"),
            NodeInput::new("H").with_parent("G"),
            NodeInput::new("h").with_parent("H"),
        ];
        let edges = vec![EdgeInput::new("l1", "a", "a"), EdgeInput::new("l2", "H", "H")];
        let out = expand_self_loops(&nodes, &edges).unwrap();

        let a1 = out.nodes.iter().find(|n| n.id == "a---a---1").unwrap();
        assert_eq!(a1.parent_id.as_deref(), Some("G"));
        assert_eq!(a1.width, Some(0.0));
        assert_eq!(out.edges[0].from_cluster, None);

        let cluster_loop: Vec<_> = out.edges[3..].iter().collect();
        assert_eq!(cluster_loop[0].from_cluster.as_deref(), Some("H"));
        assert_eq!(cluster_loop[1].from_cluster, None);
        assert_eq!(cluster_loop[2].to_cluster.as_deref(), Some("H"));
    }

    #[test]
    fn repeated_loops_get_distinct_ids() {
        let nodes = vec![NodeInput::new("A")];
        let edges = vec![EdgeInput::new("l1", "A", "A"), EdgeInput::new("l2", "A", "A")];
        let out = expand_self_loops(&nodes, &edges).unwrap();
        assert_eq!(
            ids(&out.nodes, |n| n.id.as_str()),
            ["A", "A---A---1", "A---A---2", "A---A---1-2", "A---A---2-2"]
        );
        assert_eq!(out.edges[3].input.id, "A-cyclic-special-1-2");
        assert_eq!(out.edges.len(), 6);
    }

    #[test]
    fn loop_on_unknown_node_fails() {
        let err = expand_self_loops(&[], &[EdgeInput::new("l", "Z", "Z")]).unwrap_err();
        assert!(matches!(err, Error::UnknownNode { node, .. } if node == "Z"));
    }
}
