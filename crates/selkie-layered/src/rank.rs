//! Longest-path ranking.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankEdge {
    pub v: usize,
    pub w: usize,
    pub minlen: usize,
}

/// Assigns every node the length of the longest path reaching it, honoring `minlen`.
///
/// Edges flagged in `reversed` are followed backwards. The result is normalized so the smallest
/// rank is `0`. Nodes without edges end up on rank `0`.
pub fn longest_path(node_count: usize, edges: &[RankEdge], reversed: &[bool]) -> Vec<i32> {
    let mut out_edges: Vec<Vec<(usize, i32)>> = vec![Vec::new(); node_count];
    let mut in_degree = vec![0usize; node_count];
    for (i, e) in edges.iter().enumerate() {
        let (v, w) = if reversed.get(i).copied().unwrap_or(false) {
            (e.w, e.v)
        } else {
            (e.v, e.w)
        };
        out_edges[v].push((w, e.minlen.max(1) as i32));
        in_degree[w] += 1;
    }

    let mut rank = vec![0i32; node_count];
    let mut queue: VecDeque<usize> = (0..node_count).filter(|&v| in_degree[v] == 0).collect();
    while let Some(v) = queue.pop_front() {
        for &(w, minlen) in &out_edges[v] {
            rank[w] = rank[w].max(rank[v] + minlen);
            in_degree[w] -= 1;
            if in_degree[w] == 0 {
                queue.push_back(w);
            }
        }
    }

    let min = rank.iter().copied().min().unwrap_or(0);
    for r in &mut rank {
        *r -= min;
    }
    rank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_the_longest_chain() {
        let edges = vec![
            RankEdge { v: 0, w: 1, minlen: 1 },
            RankEdge { v: 1, w: 2, minlen: 1 },
            RankEdge { v: 0, w: 2, minlen: 1 },
            RankEdge { v: 3, w: 2, minlen: 3 },
        ];
        assert_eq!(longest_path(4, &edges, &[false; 4]), vec![0, 1, 3, 0]);
    }

    #[test]
    fn reversed_edges_are_followed_backwards() {
        let edges = vec![
            RankEdge { v: 0, w: 1, minlen: 1 },
            RankEdge { v: 1, w: 0, minlen: 1 },
        ];
        assert_eq!(longest_path(2, &edges, &[false, true]), vec![0, 1]);
    }
}
