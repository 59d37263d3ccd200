//! The topology filter: neighbour support along every template edge.

use bit_vec::BitVec;
use multigraph::Graph;

use crate::candidates::CandidateMatrix;

/// For every template edge `t -> u` of multiplicity `mult` in channel `c`, a world node can only
/// stand in for `t` if it has an out-neighbour (with multiplicity at least `mult` in `c`) which
/// is still a candidate for `u`, and symmetrically for `u` with in-neighbours.  Clears every
/// candidate without such support.
///
/// Returns the number of bits cleared.
pub fn topology_filter(template: &Graph, world: &Graph, m: &mut CandidateMatrix) -> usize {
    let mut cleared = 0;
    for c in 0..template.n_channels() {
        let w_adj = world.adj(c);
        let w_adj_t = world.adj_transpose(c);
        let template_edges: Vec<(usize, usize, u32)> = template.adj(c).entries().collect();
        for (t, u, mult) in template_edges {
            if t == u {
                continue; // template self-loops are the statistics filter's business
            }
            // Support for t: world nodes with a sufficiently heavy edge into some candidate of u
            let mut supported = BitVec::from_elem(world.n_nodes(), false);
            for w_u in m.row_indices(u) {
                for (w, edge_mult) in w_adj_t.row(w_u) {
                    if edge_mult >= mult {
                        supported.set(w, true);
                    }
                }
            }
            cleared += clear_unsupported(m, t, &supported);

            // Support for u: world nodes with a sufficiently heavy edge from some candidate of t
            let mut supported = BitVec::from_elem(world.n_nodes(), false);
            for w_t in m.row_indices(t) {
                for (w, edge_mult) in w_adj.row(w_t) {
                    if edge_mult >= mult {
                        supported.set(w, true);
                    }
                }
            }
            cleared += clear_unsupported(m, u, &supported);
        }
    }
    cleared
}

fn clear_unsupported(m: &mut CandidateMatrix, t: usize, supported: &BitVec) -> usize {
    let failing: Vec<usize> = m.row_indices(t).filter(|&w| !supported[w]).collect();
    let n = failing.len();
    for w in failing {
        m.clear(t, w);
    }
    n
}
