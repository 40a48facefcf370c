//! The core [`Graph`] container.
//!
//! Nodes and edges are kept in insertion order. Layout passes iterate them a lot and rely on a
//! stable order for deterministic output, so removal preserves the order of the remaining entries.

mod edge_key;
mod options;

pub use edge_key::EdgeKey;
pub use options::GraphOptions;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type OrderedMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Borrowed edge key used for lookups without allocating an [`EdgeKey`].
#[derive(Clone, Copy, Hash)]
struct EdgeKeyRef<'a> {
    v: &'a str,
    w: &'a str,
    name: Option<&'a str>,
}

impl indexmap::Equivalent<EdgeKey> for EdgeKeyRef<'_> {
    fn equivalent(&self, key: &EdgeKey) -> bool {
        key.v == self.v && key.w == self.w && key.name.as_deref() == self.name
    }
}

#[derive(Debug, Clone)]
pub struct Graph<N, E, G> {
    options: GraphOptions,
    graph_label: G,
    nodes: OrderedMap<String, N>,
    edges: OrderedMap<EdgeKey, E>,
    parent: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
}

impl<N, E, G> Graph<N, E, G>
where
    N: Default,
    E: Default,
    G: Default,
{
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            graph_label: G::default(),
            nodes: OrderedMap::default(),
            edges: OrderedMap::default(),
            parent: HashMap::default(),
            children: HashMap::default(),
        }
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub fn set_graph(&mut self, label: G) -> &mut Self {
        self.graph_label = label;
        self
    }

    pub fn graph(&self) -> &G {
        &self.graph_label
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph_label
    }

    fn key_ref<'a>(&self, v: &'a str, w: &'a str, name: Option<&'a str>) -> EdgeKeyRef<'a> {
        EdgeKeyRef {
            v,
            w,
            name: if self.options.multigraph { name } else { None },
        }
    }

    // ---- nodes ----------------------------------------------------------------------------

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Inserts a node or replaces the label of an existing one (keeping its position).
    pub fn set_node(&mut self, id: impl Into<String>, label: N) -> &mut Self {
        let id = id.into();
        match self.nodes.get_mut(id.as_str()) {
            Some(slot) => *slot = label,
            None => {
                self.nodes.insert(id, label);
            }
        }
        self
    }

    /// Inserts a node with a default label when it is not present yet.
    pub fn ensure_node(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        if !self.nodes.contains_key(id.as_str()) {
            self.nodes.insert(id, N::default());
        }
        self
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.nodes.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Removes a node together with its incident edges and its parent/child links.
    ///
    /// Children of a removed node become roots; they are not removed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.shift_remove(id).is_none() {
            return false;
        }

        self.edges.retain(|key, _| !key.touches(id));

        if let Some(parent) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|c| c != id);
            }
        }
        if let Some(children) = self.children.remove(id) {
            for child in children {
                self.parent.remove(&child);
            }
        }
        true
    }

    // ---- edges ----------------------------------------------------------------------------

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.keys()
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges.keys().cloned().collect()
    }

    pub fn edge_entries(&self) -> impl Iterator<Item = (&EdgeKey, &E)> {
        self.edges.iter()
    }

    pub fn set_edge(&mut self, v: impl Into<String>, w: impl Into<String>) -> &mut Self {
        self.set_edge_named(v, w, None::<String>, None)
    }

    pub fn set_edge_with_label(
        &mut self,
        v: impl Into<String>,
        w: impl Into<String>,
        label: E,
    ) -> &mut Self {
        self.set_edge_named(v, w, None::<String>, Some(label))
    }

    /// Inserts an edge, creating missing endpoints with default labels.
    ///
    /// When the edge already exists its label is replaced if one is given; otherwise the
    /// existing label is kept.
    pub fn set_edge_named(
        &mut self,
        v: impl Into<String>,
        w: impl Into<String>,
        name: Option<impl Into<String>>,
        label: Option<E>,
    ) -> &mut Self {
        let v = v.into();
        let w = w.into();
        self.ensure_node(v.as_str());
        self.ensure_node(w.as_str());

        let name = if self.options.multigraph {
            name.map(Into::into)
        } else {
            None
        };
        let key = EdgeKey { v, w, name };
        match self.edges.get_mut(&key) {
            Some(slot) => {
                if let Some(label) = label {
                    *slot = label;
                }
            }
            None => {
                self.edges.insert(key, label.unwrap_or_default());
            }
        }
        self
    }

    pub fn set_edge_key(&mut self, key: EdgeKey, label: E) -> &mut Self {
        self.set_edge_named(key.v, key.w, key.name, Some(label))
    }

    pub fn has_edge(&self, v: &str, w: &str, name: Option<&str>) -> bool {
        self.edges.contains_key(&self.key_ref(v, w, name))
    }

    pub fn edge(&self, v: &str, w: &str, name: Option<&str>) -> Option<&E> {
        self.edges.get(&self.key_ref(v, w, name))
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&E> {
        self.edge(&key.v, &key.w, key.name.as_deref())
    }

    pub fn edge_mut_by_key(&mut self, key: &EdgeKey) -> Option<&mut E> {
        let lookup = self.key_ref(&key.v, &key.w, key.name.as_deref());
        self.edges.get_mut(&lookup)
    }

    /// Removes an edge and returns its label.
    pub fn take_edge(&mut self, key: &EdgeKey) -> Option<E> {
        let lookup = self.key_ref(&key.v, &key.w, key.name.as_deref());
        self.edges.shift_remove(&lookup)
    }

    pub fn remove_edge(&mut self, v: &str, w: &str, name: Option<&str>) -> bool {
        let lookup = self.key_ref(v, w, name);
        self.edges.shift_remove(&lookup).is_some()
    }

    pub fn out_edges(&self, v: &str, w: Option<&str>) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|k| k.v == v && w.is_none_or(|w| k.w == w))
            .cloned()
            .collect()
    }

    pub fn in_edges(&self, v: &str, u: Option<&str>) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|k| k.w == v && u.is_none_or(|u| k.v == u))
            .cloned()
            .collect()
    }

    /// All edges with `v` as either endpoint, in insertion order.
    pub fn node_edges(&self, v: &str) -> Vec<EdgeKey> {
        self.edges.keys().filter(|k| k.touches(v)).cloned().collect()
    }

    pub fn successors(&self, v: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for k in self.edges.keys().filter(|k| k.v == v) {
            if !out.contains(&k.w.as_str()) {
                out.push(k.w.as_str());
            }
        }
        out
    }

    pub fn predecessors(&self, v: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for k in self.edges.keys().filter(|k| k.w == v) {
            if !out.contains(&k.v.as_str()) {
                out.push(k.v.as_str());
            }
        }
        out
    }

    /// Nodes without incoming edges.
    pub fn sources(&self) -> Vec<&str> {
        self.nodes()
            .filter(|n| !self.edges.keys().any(|k| k.w == *n))
            .collect()
    }

    // ---- hierarchy ------------------------------------------------------------------------

    /// Makes `parent` the parent of `child`, creating either node when missing.
    ///
    /// This does not reject cycles; callers that accept untrusted input must validate the
    /// hierarchy (see [`Graph::ancestors`]).
    pub fn set_parent(&mut self, child: impl Into<String>, parent: impl Into<String>) -> &mut Self {
        if !self.options.compound {
            return self;
        }
        let child = child.into();
        let parent = parent.into();
        self.ensure_node(child.as_str());
        self.ensure_node(parent.as_str());
        if let Some(prev) = self.parent.insert(child.clone(), parent.clone()) {
            if let Some(siblings) = self.children.get_mut(&prev) {
                siblings.retain(|c| c != &child);
            }
        }
        let entry = self.children.entry(parent).or_default();
        if !entry.contains(&child) {
            entry.push(child);
        }
        self
    }

    pub fn parent(&self, child: &str) -> Option<&str> {
        self.parent.get(child).map(String::as_str)
    }

    pub fn children(&self, parent: &str) -> Vec<&str> {
        self.children
            .get(parent)
            .map(|c| c.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// Nodes without a parent, in insertion order.
    pub fn children_root(&self) -> Vec<&str> {
        self.nodes()
            .filter(|n| !self.parent.contains_key(*n))
            .collect()
    }

    /// Walks the parent chain of `id`, nearest ancestor first.
    ///
    /// Stops early (returning what was collected so far) when a node repeats, so a malformed
    /// hierarchy cannot make this loop forever.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == id || out.contains(&p) {
                break;
            }
            out.push(p);
            cur = self.parent(p);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound() -> Graph<u32, &'static str, ()> {
        Graph::new(GraphOptions::compound_multigraph())
    }

    #[test]
    fn remove_node_keeps_insertion_order_and_drops_incident_edges() {
        let mut g = compound();
        g.set_node("a", 1).set_node("b", 2).set_node("c", 3);
        g.set_edge_with_label("a", "b", "ab");
        g.set_edge_with_label("b", "c", "bc");
        g.set_edge_with_label("a", "c", "ac");

        assert!(g.remove_node("b"));
        assert_eq!(g.node_ids(), vec!["a", "c"]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge("a", "c", None), Some(&"ac"));
    }

    #[test]
    fn named_edges_are_distinct_only_in_multigraphs() {
        let mut multi = compound();
        multi.set_edge_named("a", "b", Some("x"), Some("first"));
        multi.set_edge_named("a", "b", Some("y"), Some("second"));
        assert_eq!(multi.edge_count(), 2);
        assert_eq!(multi.edge("a", "b", Some("y")), Some(&"second"));

        let mut simple: Graph<u32, &'static str, ()> = Graph::new(GraphOptions::default());
        simple.set_edge_named("a", "b", Some("x"), Some("first"));
        simple.set_edge_named("a", "b", Some("y"), Some("second"));
        assert_eq!(simple.edge_count(), 1);
        assert_eq!(simple.edge("a", "b", None), Some(&"second"));
    }

    #[test]
    fn set_parent_moves_child_between_parents() {
        let mut g = compound();
        g.set_parent("a", "p1");
        g.set_parent("a", "p2");
        assert!(g.children("p1").is_empty());
        assert_eq!(g.children("p2"), vec!["a"]);
        assert_eq!(g.parent("a"), Some("p2"));
    }

    #[test]
    fn ancestors_stops_on_cycles() {
        let mut g = compound();
        g.set_parent("a", "b");
        g.set_parent("b", "c");
        g.set_parent("c", "a");
        assert_eq!(g.ancestors("a"), vec!["b", "c"]);
    }
}
