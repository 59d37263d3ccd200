//! The partial match: the stack of bindings along the current DFS path.

use std::collections::HashSet;

use crate::supernode::{Supernode, SupernodeIdx, SupernodeVec};

/// One binding on the partial-match stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub supernode: SupernodeIdx,
    /// The representative world supernode actually bound; `image.len()` equals the template
    /// supernode's size.
    pub image: Supernode,
    /// Every world vertex interchangeable into this binding (superset of `image`'s vertices).
    pub participants: Supernode,
    /// How many equivalent images `participants` stands for.
    pub n_variants: u64,
}

impl MatchEntry {
    /// A binding with no world-side compression: the image stands only for itself.
    pub fn simple(supernode: SupernodeIdx, image: Supernode) -> Self {
        Self {
            supernode,
            participants: image.clone(),
            image,
            n_variants: 1,
        }
    }
}

/// An append-only stack of supernode bindings with all-different bookkeeping.
///
/// **Invariants**: each template supernode appears at most once, and the images of distinct
/// entries are pairwise disjoint.
#[derive(Debug, Clone)]
pub struct PartialMatch {
    entries: Vec<MatchEntry>,
    /// Supernode -> position in `entries`, if bound.
    position_of: SupernodeVec<Option<usize>>,
    /// Union of the bound images, for O(1) all-different checks.
    matched_world: HashSet<usize>,
}

impl PartialMatch {
    pub fn new(n_supernodes: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n_supernodes),
            position_of: (0..n_supernodes).map(|_| None).collect(),
            matched_world: HashSet::new(),
        }
    }

    /// The number of bound supernodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_matched(&self, sn: SupernodeIdx) -> bool {
        self.position_of[sn].is_some()
    }

    /// The image a supernode is bound to, if it is bound.
    pub fn image_of(&self, sn: SupernodeIdx) -> Option<&Supernode> {
        self.position_of[sn].map(|pos| &self.entries[pos].image)
    }

    /// The most recent binding.
    pub fn last(&self) -> Option<&MatchEntry> {
        self.entries.last()
    }

    /// The bindings in the order they were made.
    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    /// True iff `image` shares no world vertex with any bound image.
    pub fn is_disjoint_from_matched(&self, image: &Supernode) -> bool {
        image
            .vertices()
            .iter()
            .all(|v| !self.matched_world.contains(v))
    }

    #[inline]
    pub fn is_world_vertex_matched(&self, v: usize) -> bool {
        self.matched_world.contains(&v)
    }

    /// Pushes a binding.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the supernode is already bound or the image overlaps a bound
    /// image; the matcher must only push joinable candidates.
    pub fn push(&mut self, entry: MatchEntry) {
        debug_assert!(
            !self.is_matched(entry.supernode),
            "supernode {:?} bound twice",
            entry.supernode
        );
        debug_assert!(
            self.is_disjoint_from_matched(&entry.image),
            "image {} overlaps the matched world",
            entry.image
        );
        self.position_of[entry.supernode] = Some(self.entries.len());
        self.matched_world.extend(entry.image.vertices());
        self.entries.push(entry);
    }

    /// Pops the most recent binding.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> MatchEntry {
        let entry = self.entries.pop().expect("pop from an empty partial match");
        self.position_of[entry.supernode] = None;
        for v in entry.image.vertices() {
            self.matched_world.remove(v);
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sn: usize, vertices: Vec<usize>) -> MatchEntry {
        MatchEntry::simple(SupernodeIdx::new(sn), Supernode::new(vertices))
    }

    #[test]
    fn push_pop_round_trip() {
        let mut pm = PartialMatch::new(3);
        assert!(pm.is_empty());

        pm.push(entry(0, vec![4, 7]));
        pm.push(entry(2, vec![1]));
        assert_eq!(pm.len(), 2);
        assert!(pm.is_matched(SupernodeIdx::new(0)));
        assert!(!pm.is_matched(SupernodeIdx::new(1)));
        assert_eq!(
            pm.image_of(SupernodeIdx::new(0)),
            Some(&Supernode::new(vec![4, 7]))
        );
        assert_eq!(pm.last().unwrap().supernode, SupernodeIdx::new(2));

        let popped = pm.pop();
        assert_eq!(popped.supernode, SupernodeIdx::new(2));
        assert!(!pm.is_matched(SupernodeIdx::new(2)));
        assert!(pm.is_disjoint_from_matched(&Supernode::singleton(1)));
        assert!(!pm.is_disjoint_from_matched(&Supernode::new(vec![2, 7])));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "bound twice")]
    fn double_binding_is_rejected() {
        let mut pm = PartialMatch::new(2);
        pm.push(entry(0, vec![1]));
        pm.push(entry(0, vec![2]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "overlaps")]
    fn overlapping_images_are_rejected() {
        let mut pm = PartialMatch::new(2);
        pm.push(entry(0, vec![1, 2]));
        pm.push(entry(1, vec![2, 3]));
    }
}
