//! Small traversal helpers over the compound hierarchy.

use crate::Graph;
use std::collections::HashSet;

/// Orders nodes so that every parent is listed before its children.
///
/// Each level is emitted as a block: the given nodes first, then (recursively) the children of
/// each of them. Roots are the nodes without a parent. A node is emitted at most once even if
/// the hierarchy is malformed.
pub fn hierarchy_order<N, E, G>(g: &Graph<N, E, G>) -> Vec<String>
where
    N: Default,
    E: Default,
    G: Default,
{
    fn sorter<N, E, G>(
        g: &Graph<N, E, G>,
        level: &[&str],
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) where
        N: Default,
        E: Default,
        G: Default,
    {
        let fresh: Vec<&str> = level
            .iter()
            .copied()
            .filter(|id| seen.insert((*id).to_string()))
            .collect();
        out.extend(fresh.iter().map(|s| s.to_string()));
        for id in fresh {
            let children = g.children(id);
            sorter(g, &children, seen, out);
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(g.node_count());
    let roots = g.children_root();
    sorter(g, &roots, &mut seen, &mut out);
    out
}

/// Depth of `id` in the compound hierarchy (roots have depth 0).
pub fn depth<N, E, G>(g: &Graph<N, E, G>, id: &str) -> usize
where
    N: Default,
    E: Default,
    G: Default,
{
    g.ancestors(id).len()
}

/// Lowest common ancestor of two nodes, if they share one.
pub fn lowest_common_parent<N, E, G>(g: &Graph<N, E, G>, a: &str, b: &str) -> Option<String>
where
    N: Default,
    E: Default,
    G: Default,
{
    let ancestors_a: HashSet<&str> = g.ancestors(a).into_iter().collect();
    g.ancestors(b)
        .into_iter()
        .find(|p| ancestors_a.contains(p))
        .map(str::to_string)
}
