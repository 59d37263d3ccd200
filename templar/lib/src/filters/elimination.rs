//! The elimination filter: global all-different propagation.
//!
//! Injectivity means the template rows of the candidate matrix must admit a system of distinct
//! representatives.  Following Régin's all-different propagator (in the van Hoeve formulation),
//! a maximum bipartite matching is computed once; a candidate bit is then viable only if its
//! edge is in the matching, lies inside a strongly-connected component of the residual graph, or
//! lies on an alternating path from a matching-free world node.  Everything else can never be
//! part of *any* injective assignment and is cleared.

use std::collections::VecDeque;

use multigraph::Graph;

use crate::{
    bipartite::{maximum_matching, strongly_connected_components},
    candidates::CandidateMatrix,
};

/// Runs one pass of all-different elimination.  Returns the number of bits cleared.
///
/// If no perfect matching of the template side exists the instance is unsatisfiable and every
/// row is cleared outright.
pub fn elimination_filter(_template: &Graph, _world: &Graph, m: &mut CandidateMatrix) -> usize {
    let n_template = m.n_template();
    let n_world = m.n_world();
    let adj: Vec<Vec<usize>> = (0..n_template).map(|t| m.row_indices(t).collect()).collect();

    let matching = maximum_matching(&adj, n_world);
    if matching.len() < n_template {
        // Hall's condition already fails globally
        let mut cleared = 0;
        for (t, row) in adj.iter().enumerate() {
            for &w in row {
                m.clear(t, w);
                cleared += 1;
            }
        }
        return cleared;
    }

    // Residual digraph on template nodes `0..n_template` and world nodes `n_template..`:
    // matched edges point template -> world, unmatched edges world -> template.  An unmatched
    // edge (t, w) then lies on an alternating path from a free world node exactly when `w` is
    // reachable from one.
    let mut digraph = vec![Vec::new(); n_template + n_world];
    for (t, row) in adj.iter().enumerate() {
        for &w in row {
            if matching.pair_left[t] == Some(w) {
                digraph[t].push(n_template + w);
            } else {
                digraph[n_template + w].push(t);
            }
        }
    }

    let component = strongly_connected_components(&digraph);

    let mut reachable = vec![false; n_template + n_world];
    let mut queue: VecDeque<usize> = (0..n_world)
        .filter(|&w| matching.pair_right[w].is_none())
        .map(|w| n_template + w)
        .collect();
    for &v in &queue {
        reachable[v] = true;
    }
    while let Some(v) = queue.pop_front() {
        for &next in &digraph[v] {
            if !reachable[next] {
                reachable[next] = true;
                queue.push_back(next);
            }
        }
    }

    let mut cleared = 0;
    for (t, row) in adj.iter().enumerate() {
        for &w in row {
            let viable = matching.pair_left[t] == Some(w)
                || component[t] == component[n_template + w]
                || reachable[n_template + w];
            if !viable {
                m.clear(t, w);
                cleared += 1;
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use multigraph::CsrMatrix;

    use super::*;

    fn dummy_graphs(n_template: usize, n_world: usize) -> (Graph, Graph) {
        let g = |n| {
            Graph::from_indexed_nodes(
                "g",
                n,
                vec!["0".to_owned()],
                vec![CsrMatrix::zeros(n, n)],
            )
        };
        (g(n_template), g(n_world))
    }

    fn matrix(rows: &[&[usize]], n_world: usize) -> CandidateMatrix {
        let mut m = CandidateMatrix::full(rows.len(), n_world);
        for (t, row) in rows.iter().enumerate() {
            let clear: Vec<usize> = (0..n_world).filter(|w| !row.contains(w)).collect();
            for w in clear {
                m.clear(t, w);
            }
        }
        m
    }

    #[test]
    fn forced_assignment_propagates() {
        // t0 can only be w0, so w0 is off-limits for t1
        let (template, world) = dummy_graphs(2, 2);
        let mut m = matrix(&[&[0], &[0, 1]], 2);
        let cleared = elimination_filter(&template, &world, &mut m);
        assert_eq!(cleared, 1);
        assert_eq!(m.row_indices(1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn hall_failure_clears_everything() {
        // Two template nodes both restricted to one world node
        let (template, world) = dummy_graphs(2, 2);
        let mut m = matrix(&[&[0], &[0]], 2);
        elimination_filter(&template, &world, &mut m);
        assert_eq!(m.first_empty_row(), Some(0));
        assert_eq!(m.count_ones(), 0);
    }

    #[test]
    fn interchangeable_candidates_survive() {
        // A 2x2 square of candidates: both assignments are possible, nothing is cleared
        let (template, world) = dummy_graphs(2, 3);
        let mut m = matrix(&[&[0, 1], &[0, 1]], 3);
        assert_eq!(elimination_filter(&template, &world, &mut m), 0);
        assert_eq!(m.row_count(0), 2);
        assert_eq!(m.row_count(1), 2);
    }

    #[test]
    fn free_world_nodes_keep_alternatives_alive() {
        // t0 in {0, 1}, t1 in {1, 2}: every edge lies on an alternating path from a free node
        let (template, world) = dummy_graphs(2, 3);
        let mut m = matrix(&[&[0, 1], &[1, 2]], 3);
        assert_eq!(elimination_filter(&template, &world, &mut m), 0);
    }

    #[test]
    fn pigeonhole_subproblem_is_detected() {
        // t0 and t1 fight over {0, 1}; t2 may not take either, but also likes w2
        let (template, world) = dummy_graphs(3, 3);
        let mut m = matrix(&[&[0, 1], &[0, 1], &[0, 2]], 3);
        let cleared = elimination_filter(&template, &world, &mut m);
        assert_eq!(cleared, 1);
        assert_eq!(m.row_indices(2).collect::<Vec<_>>(), vec![2]);
        // The interchangeable pair is untouched
        assert_eq!(m.row_count(0), 2);
        assert_eq!(m.row_count(1), 2);
    }
}
