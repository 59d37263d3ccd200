//! The solution tree: a compact representation of the solution space.
//!
//! Solutions arrive as full partial matches.  Each one is recorded against a fixed reporting
//! order (the search's static ordering): the isomorphism counter absorbs the combinatorial
//! weight of the binding (intra-class permutations and interchangeable world images), while
//! the tree of match paths (skipped in count-only mode) supports queries over the solution
//! space: which world nodes participate in any match, and which world supernodes each template
//! supernode was ever bound to.

use std::collections::{BTreeMap, BTreeSet};

use factorial::Factorial;

use crate::{
    search::{MatchEntry, PartialMatch},
    supernode::{Supernode, SupernodeIdx, SupernodeVec},
};

/// The accumulated solutions of one search.
#[derive(Debug, Clone)]
pub struct SolutionTree {
    /// The reporting order: every full match is recorded supernode-by-supernode in this order.
    order: Vec<SupernodeIdx>,
    /// Supernode -> position in `order`.
    position_of: SupernodeVec<usize>,
    /// Per reporting position: the participant sets ever bound there.
    images: Vec<BTreeSet<Supernode>>,
    /// Total isomorphism count, including combinatorial weights.
    n_isomorphisms: u128,
    /// Number of recorded match events (tree leaves, ignoring weights).
    n_match_events: u64,
    /// The explicit tree of match paths; `None` in count-only mode.
    root: Option<TreeNode>,
}

/// An interior node of the explicit solution tree.  Children are keyed by the participant
/// supernode bound at the next reporting position.
#[derive(Debug, Clone, Default)]
struct TreeNode {
    children: BTreeMap<Supernode, TreeNode>,
}

impl SolutionTree {
    /// An empty tree with the given reporting order over `n_supernodes` supernodes.
    pub fn new(order: Vec<SupernodeIdx>, n_supernodes: usize, count_only: bool) -> Self {
        assert_eq!(order.len(), n_supernodes, "order must cover every supernode");
        let mut position_of: SupernodeVec<usize> = (0..n_supernodes).map(|_| usize::MAX).collect();
        for (pos, &sn) in order.iter().enumerate() {
            position_of[sn] = pos;
        }
        Self {
            images: vec![BTreeSet::new(); order.len()],
            order,
            position_of,
            n_isomorphisms: 0,
            n_match_events: 0,
            root: (!count_only).then(TreeNode::default),
        }
    }

    /// Records one full match.
    ///
    /// The counter grows by the product, over the bindings, of `n_variants * |supernode|!`:
    /// each binding stands for `n_variants` interchangeable world images, and each image admits
    /// every permutation of the template class onto it.
    ///
    /// # Panics
    ///
    /// Panics if the match doesn't bind every supernode.
    pub fn add_solution(&mut self, pm: &PartialMatch) {
        assert_eq!(pm.len(), self.order.len(), "match must be complete");
        self.n_isomorphisms = self.n_isomorphisms.saturating_add(solution_weight(pm.entries()));
        self.n_match_events += 1;

        for entry in pm.entries() {
            self.images[self.position_of[entry.supernode]].insert(entry.participants.clone());
        }
        if let Some(root) = &mut self.root {
            let mut node = root;
            for &sn in &self.order {
                let participants = &pm
                    .entries()
                    .iter()
                    .find(|e| e.supernode == sn)
                    .expect("complete match binds every supernode")
                    .participants;
                node = node.children.entry(participants.clone()).or_default();
            }
        }
    }

    /* Queries */

    /// The total number of isomorphisms found so far.
    #[inline]
    pub fn isomorphism_count(&self) -> u128 {
        self.n_isomorphisms
    }

    /// The number of match events recorded (solutions up to class permutation).
    #[inline]
    pub fn match_count(&self) -> u64 {
        self.n_match_events
    }

    /// True iff no match was found.
    pub fn is_unsatisfiable(&self) -> bool {
        self.n_match_events == 0
    }

    /// The reporting order.
    pub fn reporting_order(&self) -> &[SupernodeIdx] {
        &self.order
    }

    /// Every world vertex which participates in at least one match.
    pub fn signal_nodes(&self) -> BTreeSet<usize> {
        self.images
            .iter()
            .flatten()
            .flat_map(|sn| sn.vertices().iter().copied())
            .collect()
    }

    /// For each supernode (in reporting order), the set of world supernodes it was ever bound
    /// to: the minimal complete candidate set observed.
    pub fn candidate_sets(&self) -> impl Iterator<Item = (SupernodeIdx, &BTreeSet<Supernode>)> {
        self.order.iter().copied().zip(self.images.iter())
    }

    /// Walks the explicit tree depth-first, yielding every recorded root-to-leaf path.
    /// Empty in count-only mode.
    pub fn paths(&self) -> Vec<Vec<&Supernode>> {
        let mut paths = Vec::new();
        if let Some(root) = &self.root {
            let mut prefix = Vec::new();
            collect_paths(root, &mut prefix, &mut paths);
        }
        paths
    }
}

fn collect_paths<'t>(
    node: &'t TreeNode,
    prefix: &mut Vec<&'t Supernode>,
    paths: &mut Vec<Vec<&'t Supernode>>,
) {
    if node.children.is_empty() {
        if !prefix.is_empty() {
            paths.push(prefix.clone());
        }
        return;
    }
    for (sn, child) in &node.children {
        prefix.push(sn);
        collect_paths(child, prefix, paths);
        prefix.pop();
    }
}

/// The combinatorial weight of one recorded match.
fn solution_weight(entries: &[MatchEntry]) -> u128 {
    entries
        .iter()
        .map(|e| u128::from(e.n_variants).saturating_mul((e.image.len() as u128).factorial()))
        .fold(1u128, u128::saturating_mul)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(i: usize) -> SupernodeIdx {
        SupernodeIdx::new(i)
    }

    fn complete_match(entries: Vec<MatchEntry>) -> PartialMatch {
        let mut pm = PartialMatch::new(entries.len());
        for e in entries {
            pm.push(e);
        }
        pm
    }

    #[test]
    fn counts_class_permutations() {
        let mut tree = SolutionTree::new(vec![idx(0), idx(1)], 2, false);
        // Supernode 0 is a class of size 2, supernode 1 trivial
        tree.add_solution(&complete_match(vec![
            MatchEntry::simple(idx(0), Supernode::new(vec![3, 5])),
            MatchEntry::simple(idx(1), Supernode::singleton(7)),
        ]));
        // 2! * 1! = 2
        assert_eq!(tree.isomorphism_count(), 2);
        assert_eq!(tree.match_count(), 1);
    }

    #[test]
    fn counts_world_variants_as_falling_factorials() {
        let mut tree = SolutionTree::new(vec![idx(0)], 1, true);
        // A template pair bound into a world class of 3 interchangeable nodes:
        // C(3, 2) = 3 variants, each worth 2! orderings -> 6 = 3 * 2 * 1 falling factorial
        tree.add_solution(&complete_match(vec![MatchEntry {
            supernode: idx(0),
            image: Supernode::new(vec![1, 2]),
            participants: Supernode::new(vec![1, 2, 4]),
            n_variants: 3,
        }]));
        assert_eq!(tree.isomorphism_count(), 6);
    }

    #[test]
    fn signal_nodes_and_candidate_sets() {
        let mut tree = SolutionTree::new(vec![idx(1), idx(0)], 2, false);
        tree.add_solution(&complete_match(vec![
            MatchEntry::simple(idx(0), Supernode::singleton(2)),
            MatchEntry::simple(idx(1), Supernode::singleton(0)),
        ]));
        tree.add_solution(&complete_match(vec![
            MatchEntry::simple(idx(1), Supernode::singleton(0)),
            MatchEntry::simple(idx(0), Supernode::singleton(4)),
        ]));

        assert_eq!(
            tree.signal_nodes().into_iter().collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        let sets: Vec<_> = tree.candidate_sets().collect();
        assert_eq!(sets[0].0, idx(1));
        assert_eq!(sets[0].1.len(), 1);
        assert_eq!(sets[1].1.len(), 2); // supernode 0 bound to both 2 and 4
    }

    #[test]
    fn tree_paths_follow_reporting_order() {
        let mut tree = SolutionTree::new(vec![idx(1), idx(0)], 2, false);
        tree.add_solution(&complete_match(vec![
            MatchEntry::simple(idx(0), Supernode::singleton(2)),
            MatchEntry::simple(idx(1), Supernode::singleton(0)),
        ]));
        tree.add_solution(&complete_match(vec![
            MatchEntry::simple(idx(1), Supernode::singleton(0)),
            MatchEntry::simple(idx(0), Supernode::singleton(4)),
        ]));
        let paths = tree.paths();
        // Shared prefix: supernode 1's image comes first in reporting order
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0][0], &Supernode::singleton(0));
        assert_eq!(paths[0][1], &Supernode::singleton(2));
        assert_eq!(paths[1][1], &Supernode::singleton(4));
    }

    #[test]
    fn count_only_mode_skips_the_tree() {
        let mut tree = SolutionTree::new(vec![idx(0)], 1, true);
        tree.add_solution(&complete_match(vec![MatchEntry::simple(
            idx(0),
            Supernode::singleton(1),
        )]));
        assert!(tree.paths().is_empty());
        assert_eq!(tree.isomorphism_count(), 1);
    }
}
