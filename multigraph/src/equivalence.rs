//! A partition of the index range `0..n` into equivalence classes.
//!
//! Each class has a canonical *root*: its smallest member.  Roots are stable (every member of a
//! class reports the same root, and distinct classes report distinct roots), which lets callers
//! key per-class data by root.

use std::collections::BTreeMap;

/// A partition of `0..n` with canonical per-class roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalence {
    /// `roots[i]` is the smallest index in `i`'s class.
    roots: Vec<usize>,
    /// Root -> sorted members.  `BTreeMap` so that `classes()` iterates in root order.
    members: BTreeMap<usize, Vec<usize>>,
}

impl Equivalence {
    /// The trivial partition: one class containing all of `0..n`.
    pub fn single_class(n: usize) -> Self {
        let mut members = BTreeMap::new();
        if n > 0 {
            members.insert(0, (0..n).collect());
        }
        Self {
            roots: vec![0; n],
            members,
        }
    }

    /// The discrete partition: every index in its own class.
    pub fn discrete(n: usize) -> Self {
        Self {
            roots: (0..n).collect(),
            members: (0..n).map(|i| (i, vec![i])).collect(),
        }
    }

    /// Builds a partition from explicit classes.
    ///
    /// # Panics
    ///
    /// Panics if the classes don't exactly partition `0..n` for some `n`.
    pub fn from_classes(classes: impl IntoIterator<Item = Vec<usize>>) -> Self {
        let mut members = BTreeMap::new();
        let mut index_to_root: BTreeMap<usize, usize> = BTreeMap::new();
        for mut class in classes {
            assert!(!class.is_empty(), "empty equivalence class");
            class.sort_unstable();
            class.dedup();
            let root = class[0];
            for &i in &class {
                let prev = index_to_root.insert(i, root);
                assert!(prev.is_none(), "index {i} appears in two classes");
            }
            members.insert(root, class);
        }
        let n = index_to_root.keys().next_back().map_or(0, |&max| max + 1);
        assert_eq!(index_to_root.len(), n, "classes must cover 0..n exactly");
        let roots = (0..n).map(|i| index_to_root[&i]).collect();
        Self { roots, members }
    }

    /// The number of indices partitioned.
    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The number of classes.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.members.len()
    }

    /// The canonical (smallest) member of `i`'s class.
    #[inline]
    pub fn root_of(&self, i: usize) -> usize {
        self.roots[i]
    }

    /// The sorted members of `i`'s class.
    pub fn class_of(&self, i: usize) -> &[usize] {
        &self.members[&self.roots[i]]
    }

    #[inline]
    pub fn in_same_class(&self, i: usize, j: usize) -> bool {
        self.roots[i] == self.roots[j]
    }

    /// Iterates over the classes in increasing root order.
    pub fn classes(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.members.values().map(Vec::as_slice)
    }

    /// True iff every class is a singleton.
    pub fn is_discrete(&self) -> bool {
        self.n_classes() == self.len()
    }

    /// Refines the partition by splitting every class according to `key`: two indices stay
    /// together iff they were together before *and* have equal keys.
    pub fn refine_by<K: Ord>(&self, key: impl Fn(usize) -> K) -> Equivalence {
        let mut new_classes = Vec::new();
        for class in self.classes() {
            let mut by_key: BTreeMap<K, Vec<usize>> = BTreeMap::new();
            for &i in class {
                by_key.entry(key(i)).or_default().push(i);
            }
            new_classes.extend(by_key.into_values());
        }
        Equivalence::from_classes(new_classes)
    }
}
