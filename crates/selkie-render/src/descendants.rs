//! Transitive descendant sets of clusters.

use rustc_hash::{FxHashMap, FxHashSet};
use selkie_layered::LayoutGraph;

use crate::{Error, Result};

#[derive(Debug, Default, Clone)]
pub struct DescendantIndex {
    ordered: FxHashMap<String, Vec<String>>,
    members: FxHashMap<String, FxHashSet<String>>,
    owner: FxHashMap<String, String>,
}

impl DescendantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ordered.clear();
        self.members.clear();
        self.owner.clear();
    }

    /// Recomputes the sets of every node that has children in one bottom-up pass.
    ///
    /// Nodes whose parent chain never reaches a top-level node sit on a parent cycle, which is
    /// reported as [`Error::ParentCycle`].
    pub fn rebuild(&mut self, graph: &LayoutGraph) -> Result<()> {
        self.clear();
        for root in graph.children_root() {
            let mut stack: Vec<(&str, bool)> = vec![(root, false)];
            while let Some((id, finished)) = stack.pop() {
                let children = graph.children(id);
                if children.is_empty() {
                    continue;
                }
                if finished {
                    let mut ordered = Vec::new();
                    for child in children {
                        ordered.push(child.to_string());
                        if let Some(below) = self.ordered.get(child) {
                            ordered.extend(below.iter().cloned());
                        }
                    }
                    self.members
                        .insert(id.to_string(), ordered.iter().cloned().collect());
                    self.ordered.insert(id.to_string(), ordered);
                    continue;
                }
                stack.push((id, true));
                for child in children.into_iter().rev() {
                    self.owner.insert(child.to_string(), id.to_string());
                    stack.push((child, false));
                }
            }
        }

        let unreached = graph
            .nodes()
            .find(|id| graph.has_children(id) && !self.ordered.contains_key(*id));
        if let Some(start) = unreached {
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            let mut cur = start;
            while seen.insert(cur) {
                match graph.parent(cur) {
                    Some(parent) => cur = parent,
                    None => break,
                }
            }
            return Err(Error::ParentCycle {
                node: cur.to_string(),
            });
        }
        Ok(())
    }

    pub fn descendants(&self, cluster_id: &str) -> &[String] {
        self.ordered
            .get(cluster_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn members(&self, cluster_id: &str) -> Option<&FxHashSet<String>> {
        self.members.get(cluster_id)
    }

    pub fn is_descendant(&self, node_id: &str, cluster_id: &str) -> bool {
        self.members
            .get(cluster_id)
            .is_some_and(|set| set.contains(node_id))
    }

    /// Direct parent of `node_id` as seen while the sets were built.
    pub fn owner_of(&self, node_id: &str) -> Option<&str> {
        self.owner.get(node_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selkie_layered::NodeLabel;
    use selkie_layered::graphlib::GraphOptions;

    fn compound(nodes: &[(&str, Option<&str>)]) -> LayoutGraph {
        let mut g = LayoutGraph::new(GraphOptions::compound_multigraph());
        for (id, _) in nodes {
            g.set_node(*id, NodeLabel::default());
        }
        for (id, parent) in nodes {
            if let Some(p) = parent {
                g.set_parent(*id, *p);
            }
        }
        g
    }

    #[test]
    fn nested_descendants_are_transitive() {
        let g = compound(&[
            ("outer", None),
            ("inner", Some("outer")),
            ("a", Some("inner")),
            ("b", Some("outer")),
            ("c", None),
        ]);
        let mut idx = DescendantIndex::new();
        idx.rebuild(&g).unwrap();
        assert_eq!(idx.descendants("outer"), ["inner", "a", "b"]);
        assert_eq!(idx.members("outer").map(|m| m.len()), Some(3));
        assert_eq!(idx.descendants("inner"), ["a"]);
        assert!(idx.is_descendant("a", "outer"));
        assert!(!idx.is_descendant("c", "outer"));
        assert!(!idx.is_descendant("outer", "outer"));
        assert_eq!(idx.owner_of("a"), Some("inner"));
        assert!(idx.descendants("c").is_empty());
    }

    #[test]
    fn long_chains_are_indexed_without_recursion() {
        let ids: Vec<String> = (0..2_000).map(|i| format!("n{i}")).collect();
        let mut g = LayoutGraph::new(GraphOptions::compound_multigraph());
        for id in &ids {
            g.set_node(id.clone(), NodeLabel::default());
        }
        for pair in ids.windows(2) {
            g.set_parent(pair[1].clone(), pair[0].clone());
        }
        let mut idx = DescendantIndex::new();
        idx.rebuild(&g).unwrap();
        assert_eq!(idx.descendants("n1997"), ["n1998", "n1999"]);
        assert_eq!(idx.descendants("n0").len(), 1_999);
        assert_eq!(idx.owner_of("n1999"), Some("n1998"));
    }

    #[test]
    fn parent_cycles_are_reported() {
        let g = compound(&[("a", Some("b")), ("b", Some("a"))]);
        let mut idx = DescendantIndex::new();
        let err = idx.rebuild(&g).unwrap_err();
        assert!(matches!(err, Error::ParentCycle { .. }));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let g = compound(&[("a", Some("a"))]);
        let err = DescendantIndex::new().rebuild(&g).unwrap_err();
        assert!(matches!(err, Error::ParentCycle { node } if node == "a"));
    }
}
