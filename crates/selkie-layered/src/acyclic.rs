//! Cycle breaking for ranking.
//!
//! A depth-first walk marks every edge that points back into the current DFS stack. Those
//! edges are treated as reversed while ranking so longest-path ranking always terminates.

use crate::rank::RankEdge;

/// Returns one flag per edge: `true` when the edge closes a cycle and must be reversed.
pub fn dfs_feedback_edges(node_count: usize, edges: &[RankEdge]) -> Vec<bool> {
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (i, e) in edges.iter().enumerate() {
        out_edges[e.v].push(i);
    }

    let mut reversed = vec![false; edges.len()];
    let mut visited = vec![false; node_count];
    let mut on_stack = vec![false; node_count];

    // Iterative DFS: (node, next out-edge cursor).
    for start in 0..node_count {
        if visited[start] {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        visited[start] = true;
        on_stack[start] = true;

        while let Some(frame) = stack.last_mut() {
            let (v, cursor) = *frame;
            let Some(&edge_ix) = out_edges[v].get(cursor) else {
                on_stack[v] = false;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let w = edges[edge_ix].w;
            if on_stack[w] {
                reversed[edge_ix] = true;
            } else if !visited[w] {
                visited[w] = true;
                on_stack[w] = true;
                stack.push((w, 0));
            }
        }
    }
    reversed
}
