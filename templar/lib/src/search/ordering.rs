//! Matching order heuristics.
//!
//! A static order fixes the reporting order of the solution tree and seeds the search; during
//! the search itself the next supernode is re-chosen adaptively at every frame, since filtering
//! keeps changing the candidate counts.  Both follow fail-first: branch where the fewest
//! candidates survive.

use std::cmp::Reverse;
use std::collections::VecDeque;

use ordered_float::OrderedFloat;

use crate::{search::PartialMatch, structure::CandidateStructure, supernode::SupernodeIdx};

/// The static initial ordering.
///
/// Connected templates get the distance ordering: breadth-first from the supernode minimising
/// `candidate_count / neighbour_count`, favouring tightly-constrained roots, with ties broken by
/// that score and then degree.  Disconnected templates fall back deterministically to the plain
/// candidate-count ordering, where BFS distances are not well defined.
pub fn initial_ordering(cs: &CandidateStructure) -> Vec<SupernodeIdx> {
    if cs.template().is_connected() {
        distance_ordering(cs)
    } else {
        cand_count_ordering(cs)
    }
}

/// Among the unmatched supernodes, the one with the fewest candidates left in `cs`; ties go to
/// the larger supernode, then the higher template degree.
///
/// # Panics
///
/// Panics if every supernode is already matched.
pub fn next_supernode(cs: &CandidateStructure, pm: &PartialMatch) -> SupernodeIdx {
    cs.supernodes()
        .iter_enumerated()
        .filter(|&(idx, _)| !pm.is_matched(idx))
        .min_by_key(|&(idx, sn)| {
            (
                cs.candidate_count(idx),
                Reverse(sn.len()),
                Reverse(cs.degree(idx)),
            )
        })
        .map(|(idx, _)| idx)
        .expect("no unmatched supernode left")
}

/// Sort by ascending candidate count, breaking ties towards large, high-degree, well-connected
/// supernodes.
fn cand_count_ordering(cs: &CandidateStructure) -> Vec<SupernodeIdx> {
    let mut order: Vec<SupernodeIdx> = cs.supernodes().indices().collect();
    order.sort_by_key(|&idx| {
        (
            cs.candidate_count(idx),
            Reverse(cs.supernode(idx).len()),
            Reverse(cs.degree(idx)),
            Reverse(cs.neighbor_supernodes(idx).len()),
        )
    });
    order
}

/// BFS from the most constrained supernode; order primarily by BFS distance, then by the
/// constrainedness score, then by descending degree.
fn distance_ordering(cs: &CandidateStructure) -> Vec<SupernodeIdx> {
    let score = |idx: SupernodeIdx| -> OrderedFloat<f64> {
        let nbrs = cs.neighbor_supernodes(idx).len();
        OrderedFloat(cs.candidate_count(idx) as f64 / nbrs as f64)
    };
    let start = cs
        .supernodes()
        .indices()
        .min_by_key(|&idx| score(idx))
        .expect("template has at least one supernode");

    // BFS distances over the supernode neighbour graph
    let unreached = usize::MAX;
    let mut distance: Vec<usize> = vec![unreached; cs.supernode_count()];
    distance[start.index()] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(idx) = queue.pop_front() {
        for nbr in cs.neighbor_supernodes(idx) {
            if distance[nbr.index()] == unreached {
                distance[nbr.index()] = distance[idx.index()] + 1;
                queue.push_back(nbr);
            }
        }
    }

    let mut order: Vec<SupernodeIdx> = cs.supernodes().indices().collect();
    order.sort_by_key(|&idx| (distance[idx.index()], score(idx), Reverse(cs.degree(idx))));
    order
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use multigraph::{structural_partition, CsrMatrix, Graph};

    use crate::{
        candidates::CandidateMatrix,
        filters::{self, FilterSet},
    };

    use super::*;

    fn structure(
        n_template: usize,
        template_edges: Vec<(usize, usize, u32)>,
        n_world: usize,
        world_edges: Vec<(usize, usize, u32)>,
    ) -> CandidateStructure {
        let single = |n, t| {
            Graph::from_indexed_nodes(
                "g",
                n,
                vec!["0".to_owned()],
                vec![CsrMatrix::from_triplets(n, n, t)],
            )
        };
        let template = single(n_template, template_edges);
        let world = single(n_world, world_edges);
        let classes = structural_partition(&template);
        let mut m = CandidateMatrix::full(n_template, n_world);
        filters::run_to_fixpoint(&template, &world, &mut m, FilterSet::Cheap);
        CandidateStructure::new(Arc::new(template), classes, world, m)
    }

    #[test]
    fn most_constrained_supernode_comes_first() {
        // Template: hub 0 -> {1, 2}.  World: two hubs, so the hub is rarer than the sinks.
        let cs = structure(
            3,
            vec![(0, 1, 1), (0, 2, 1)],
            6,
            vec![(0, 1, 1), (0, 2, 1), (3, 4, 1), (3, 5, 1)],
        );
        let order = initial_ordering(&cs);
        assert_eq!(order.len(), 2);
        assert_eq!(order[0], cs.supernode_of_vertex(0));
    }

    #[test]
    fn disconnected_template_uses_cand_count_order() {
        // Two disjoint edges; the ordering must still be total and deterministic
        let cs = structure(
            4,
            vec![(0, 1, 1), (2, 3, 1)],
            4,
            vec![(0, 1, 1), (2, 3, 1)],
        );
        let order = initial_ordering(&cs);
        assert_eq!(order.len(), cs.supernode_count());
        let again = initial_ordering(&cs);
        assert_eq!(order, again);
    }

    #[test]
    fn adaptive_choice_skips_matched_supernodes() {
        let cs = structure(
            3,
            vec![(0, 1, 1), (0, 2, 1)],
            6,
            vec![(0, 1, 1), (0, 2, 1), (3, 4, 1), (3, 5, 1)],
        );
        let hub = cs.supernode_of_vertex(0);
        let sinks = cs.supernode_of_vertex(1);

        let mut pm = PartialMatch::new(cs.supernode_count());
        assert_eq!(next_supernode(&cs, &pm), hub);
        pm.push(crate::search::MatchEntry::simple(
            hub,
            crate::supernode::Supernode::singleton(0),
        ));
        assert_eq!(next_supernode(&cs, &pm), sinks);
    }
}
