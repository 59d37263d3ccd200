//! Supernodes: sorted tuples of vertex indices treated as a single matching unit.
//!
//! On the template side, a supernode is a structural-equivalence class enriched with its
//! per-channel internal multiplicities (the *clique* counts).  On the world side, supernodes are
//! plain vertex tuples: the candidates that template supernodes get bound to.

use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

use multigraph::{Equivalence, Graph};

index_vec::define_index_type! {
    /// The index of a [`SuperTemplateNode`] within a [`CandidateStructure`].
    ///
    /// [`CandidateStructure`]: crate::structure::CandidateStructure
    pub struct SupernodeIdx = usize;
}

/// An [`IndexVec`](index_vec::IndexVec) keyed by [`SupernodeIdx`].
pub type SupernodeVec<T> = index_vec::IndexVec<SupernodeIdx, T>;

/// A canonically sorted tuple of vertex indices.
///
/// Equality and hashing go through the sorted tuple, so two `Supernode`s built from the same set
/// of vertices in different orders compare equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Supernode {
    vertices: Vec<usize>,
}

impl Supernode {
    /// Creates a supernode from any collection of vertex indices.  Duplicates are removed.
    pub fn new(vertices: impl IntoIterator<Item = usize>) -> Self {
        let mut vertices: Vec<usize> = vertices.into_iter().collect();
        vertices.sort_unstable();
        vertices.dedup();
        Self { vertices }
    }

    /// A supernode holding a single vertex.
    pub fn singleton(vertex: usize) -> Self {
        Self {
            vertices: vec![vertex],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    #[inline]
    pub fn contains(&self, vertex: usize) -> bool {
        self.vertices.binary_search(&vertex).is_ok()
    }

    /// True iff `self` and `other` share no vertex.
    pub fn is_disjoint(&self, other: &Supernode) -> bool {
        // Both sides are sorted, so a merge scan does it
        let mut a = self.vertices.iter().peekable();
        let mut b = other.vertices.iter().peekable();
        while let (Some(&&x), Some(&&y)) = (a.peek(), b.peek()) {
            match x.cmp(&y) {
                std::cmp::Ordering::Less => drop(a.next()),
                std::cmp::Ordering::Greater => drop(b.next()),
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }

    /// The vertex names, looked up in a graph, joined for display.
    pub fn display_name(&self, g: &Graph) -> String {
        let names: Vec<&str> = self
            .vertices
            .iter()
            .map(|&i| g.nodes()[i].as_str())
            .collect();
        format!("({})", names.join(" "))
    }
}

impl Display for Supernode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (idx, v) in self.vertices.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

impl Debug for Supernode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Supernode{self}")
    }
}

/// A template-side supernode: one structural-equivalence class of the template.
///
/// Carries the class's canonical root and, for non-trivial classes, the number of parallel edges
/// between any two distinct members in each channel (well-defined because the members are
/// structurally interchangeable).
#[derive(Clone, PartialEq, Eq)]
pub struct SuperTemplateNode {
    node: Supernode,
    root: usize,
    /// `cliques[c]` is `A_c[i, j]` for any two distinct members `i != j`.  Empty for trivial
    /// (single-vertex) supernodes.
    cliques: Vec<u32>,
}

impl SuperTemplateNode {
    /// Builds the supernode for the class containing `root` in a template partition.
    pub fn from_class(template: &Graph, classes: &Equivalence, root: usize) -> Self {
        debug_assert_eq!(classes.root_of(root), root, "must be built from a class root");
        let members = classes.class_of(root);
        let cliques = if members.len() > 1 {
            // Any pair of distinct members will do; take the first two
            (0..template.n_channels())
                .map(|c| template.adj(c).get(members[0], members[1]))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            node: Supernode::new(members.iter().copied()),
            root,
            cliques,
        }
    }

    /// The canonical (smallest) member.  Stable across runs for the same template.
    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    /// True iff this supernode holds a single template vertex.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.node.len() == 1
    }

    /// The number of parallel edges between any two distinct members in `channel` (0 for
    /// trivial supernodes, which vacuously form a clique).
    #[inline]
    pub fn clique(&self, channel: usize) -> u32 {
        if self.is_trivial() {
            0
        } else {
            self.cliques[channel]
        }
    }

    /// True iff the members form a clique (any parallel edges at all) in `channel`.
    pub fn is_clique(&self, channel: usize) -> bool {
        self.is_trivial() || self.cliques[channel] > 0
    }
}

impl Deref for SuperTemplateNode {
    type Target = Supernode;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl Display for SuperTemplateNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.node, f)
    }
}

impl Debug for SuperTemplateNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SuperTemplateNode{} cliques {:?}", self.node, self.cliques)
    }
}
