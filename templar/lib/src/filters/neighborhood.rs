//! The neighborhood filter: a local Hall condition on each candidate pair.
//!
//! For a candidate pair `(t, w)` to survive, the neighbours of `t` must be injectively mappable
//! to neighbours of `w`, respecting both the candidate matrix and the per-channel edge
//! multiplicities around the pair.  This is checked with a bipartite matching per pair, so it is
//! the most expensive filter; a work queue re-examines a template node only when one of its
//! neighbours' rows has changed.

use std::collections::VecDeque;

use multigraph::Graph;

use crate::{bipartite::maximum_matching, candidates::CandidateMatrix};

/// Runs the neighborhood filter to its own fixpoint.  `noise_budget` relaxes the Hall condition
/// by allowing that many template neighbours to go unmatched; exact search passes 0.
///
/// Returns the number of bits cleared.
pub fn neighborhood_filter(
    template: &Graph,
    world: &Graph,
    m: &mut CandidateMatrix,
    noise_budget: usize,
) -> usize {
    let mut cleared = 0;
    let mut queued = vec![true; template.n_nodes()];
    let mut queue: VecDeque<usize> = (0..template.n_nodes()).collect();

    while let Some(t) = queue.pop_front() {
        queued[t] = false;
        let t_nbrs: Vec<usize> = template
            .neighbors(t)
            .iter()
            .copied()
            .filter(|&u| u != t)
            .collect();
        if t_nbrs.len() <= noise_budget {
            continue; // vacuously satisfiable
        }

        let candidates: Vec<usize> = m.row_indices(t).collect();
        let mut changed = false;
        for w in candidates {
            if !neighborhood_feasible(template, world, m, t, &t_nbrs, w, noise_budget) {
                m.clear(t, w);
                cleared += 1;
                changed = true;
            }
        }
        if changed {
            // A shrunk row can invalidate the Hall condition at every neighbour
            for &u in template.neighbors(t) {
                if u != t && !queued[u] {
                    queued[u] = true;
                    queue.push_back(u);
                }
            }
        }
    }
    cleared
}

/// Tests Hall's condition for one candidate pair: can the neighbours of `t` be injectively
/// assigned to neighbours of `w`, with each assignment `u -> v` respecting the candidate matrix
/// and dominating the multiplicities of the edges between the pairs in every channel?
fn neighborhood_feasible(
    template: &Graph,
    world: &Graph,
    m: &CandidateMatrix,
    t: usize,
    t_nbrs: &[usize],
    w: usize,
    noise_budget: usize,
) -> bool {
    let w_nbrs: Vec<usize> = world
        .neighbors(w)
        .iter()
        .copied()
        .filter(|&v| v != w)
        .collect();
    if w_nbrs.len() + noise_budget < t_nbrs.len() {
        return false;
    }

    let adj: Vec<Vec<usize>> = t_nbrs
        .iter()
        .map(|&u| {
            w_nbrs
                .iter()
                .enumerate()
                .filter(|&(_, &v)| m.is_candidate(u, v) && edges_dominated(template, world, t, u, w, v))
                .map(|(r, _)| r)
                .collect()
        })
        .collect();

    maximum_matching(&adj, w_nbrs.len()).len() + noise_budget >= t_nbrs.len()
}

/// True iff mapping `t -> w` and `u -> v` dominates every channel's multiplicities between the
/// two pairs, in both directions.
fn edges_dominated(template: &Graph, world: &Graph, t: usize, u: usize, w: usize, v: usize) -> bool {
    (0..template.n_channels()).all(|c| {
        world.adj(c).get(w, v) >= template.adj(c).get(t, u)
            && world.adj(c).get(v, w) >= template.adj(c).get(u, t)
    })
}
