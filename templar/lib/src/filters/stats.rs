//! The statistics filter: per-channel degree and self-loop dominance.

use multigraph::Graph;

use crate::candidates::CandidateMatrix;

/// Clears `M[t, w]` whenever `w`'s local statistics fail to dominate `t`'s in some channel:
/// a world node must have at least as many incoming edges, outgoing edges and self-loops as the
/// template node it stands in for, channel by channel.
///
/// Returns the number of bits cleared.
pub fn stats_filter(template: &Graph, world: &Graph, m: &mut CandidateMatrix) -> usize {
    let mut cleared = 0;
    for c in 0..template.n_channels() {
        let t_in = template.in_degrees(c);
        let t_out = template.out_degrees(c);
        let t_self = template.self_loops(c);
        let w_in = world.in_degrees(c);
        let w_out = world.out_degrees(c);
        let w_self = world.self_loops(c);

        for t in 0..template.n_nodes() {
            if t_in[t] == 0 && t_out[t] == 0 {
                continue; // nothing to dominate in this channel
            }
            let failing: Vec<usize> = m
                .row_indices(t)
                .filter(|&w| w_in[w] < t_in[t] || w_out[w] < t_out[t] || w_self[w] < t_self[t])
                .collect();
            for w in failing {
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

    fn graph(n: usize, channels: Vec<Vec<(usize, usize, u32)>>) -> Graph {
        let names = (0..channels.len()).map(|c| c.to_string()).collect();
        let adjs = channels
            .into_iter()
            .map(|t| CsrMatrix::from_triplets(n, n, t))
            .collect();
        Graph::from_indexed_nodes("g", n, names, adjs)
    }

    #[test]
    fn degree_dominance() {
        // Template node 0 emits two edges; world nodes 0 (out-degree 2) and 1 (out-degree 1)
        let template = graph(3, vec![vec![(0, 1, 1), (0, 2, 1)]]);
        let world = graph(3, vec![vec![(0, 1, 1), (0, 2, 1), (1, 2, 1)]]);
        let mut m = CandidateMatrix::full(3, 3);
        stats_filter(&template, &world, &mut m);
        assert_eq!(m.row_indices(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn multichannel_dominance_fails_per_channel() {
        // Template needs an edge in both channels; the world only has channel 0
        let template = graph(2, vec![vec![(0, 1, 1)], vec![(0, 1, 1)]]);
        let world = graph(2, vec![vec![(0, 1, 1)], vec![]]);
        let mut m = CandidateMatrix::full(2, 2);
        stats_filter(&template, &world, &mut m);
        assert_eq!(m.first_empty_row(), Some(0));
    }

    #[test]
    fn self_loop_dominance() {
        let template = graph(1, vec![vec![(0, 0, 2)]]);
        let world = graph(3, vec![vec![(0, 0, 2), (1, 1, 1), (1, 2, 2)]]);
        let mut m = CandidateMatrix::full(1, 3);
        stats_filter(&template, &world, &mut m);
        // Only world node 0 has two self-loops
        assert_eq!(m.row_indices(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn counts_cleared_bits() {
        let template = graph(2, vec![vec![(0, 1, 1)]]);
        let world = graph(2, vec![vec![(0, 1, 1)]]);
        let mut m = CandidateMatrix::full(2, 2);
        // t0 can only be w0, t1 can only be w1: two bits cleared
        assert_eq!(stats_filter(&template, &world, &mut m), 2);
        assert!(m.is_candidate(0, 0));
        assert!(m.is_candidate(1, 1));
    }
}
