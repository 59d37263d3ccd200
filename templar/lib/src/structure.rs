//! The candidate structure: everything one search frame needs to reason about candidates.
//!
//! A [`CandidateStructure`] bundles the (shared, immutable) template with a working copy of the
//! world and the candidate matrix.  The matcher clones it on every recursive descent, so the
//! frame-private parts (the world copy and the matrix) are owned, while the template, its
//! equivalence partition and the derived supernode tables sit behind `Arc`s and are shared by
//! every frame of the search.

use std::sync::Arc;

use itertools::Itertools;
use multigraph::{Equivalence, Graph};

use crate::{
    candidates::{CandidateMatrix, Subsets},
    filters::{self, FilterSet},
    supernode::{SuperTemplateNode, Supernode, SupernodeIdx, SupernodeVec},
};

/// The candidate structure of a template/world pair.  Cheap to clone at the Arc-shared parts,
/// deep at the frame-private parts (candidate matrix and working world).
#[derive(Clone)]
pub struct CandidateStructure {
    template: Arc<Graph>,
    classes: Arc<Equivalence>,
    supernodes: Arc<SupernodeVec<SuperTemplateNode>>,
    /// Template vertex -> the supernode holding it.
    supernode_of: Arc<Vec<SupernodeIdx>>,
    /// `in_nbrs[c][sn]`: supernodes with a superedge *into* `sn` in channel `c` (excluding
    /// `sn` itself).  `out_nbrs` likewise for superedges out of `sn`.
    in_nbrs: Arc<Vec<SupernodeVec<Vec<SupernodeIdx>>>>,
    out_nbrs: Arc<Vec<SupernodeVec<Vec<SupernodeIdx>>>>,

    world: Graph,
    candidates: CandidateMatrix,
}

impl CandidateStructure {
    /// Assembles the structure from a template, its structural partition, a (possibly already
    /// reduced) world and a seeded candidate matrix.
    pub fn new(
        template: Arc<Graph>,
        classes: Equivalence,
        world: Graph,
        candidates: CandidateMatrix,
    ) -> Self {
        assert_eq!(candidates.n_template(), template.n_nodes());
        assert_eq!(candidates.n_world(), world.n_nodes());
        assert!(!classes.is_empty(), "template partition must not be empty");

        let supernodes: SupernodeVec<SuperTemplateNode> = classes
            .classes()
            .map(|class| SuperTemplateNode::from_class(&template, &classes, class[0]))
            .collect();
        let mut supernode_of = vec![SupernodeIdx::new(0); template.n_nodes()];
        for (idx, sn) in supernodes.iter_enumerated() {
            for &v in sn.vertices() {
                supernode_of[v] = idx;
            }
        }

        let mut in_nbrs = Vec::with_capacity(template.n_channels());
        let mut out_nbrs = Vec::with_capacity(template.n_channels());
        for c in 0..template.n_channels() {
            let mut ins: SupernodeVec<Vec<SupernodeIdx>> =
                supernodes.iter().map(|_| Vec::new()).collect();
            let mut outs: SupernodeVec<Vec<SupernodeIdx>> =
                supernodes.iter().map(|_| Vec::new()).collect();
            for (idx, sn) in supernodes.iter_enumerated() {
                let root = sn.root();
                for (dst, _) in template.adj(c).row(root) {
                    let other = supernode_of[dst];
                    if other != idx && !outs[idx].contains(&other) {
                        outs[idx].push(other);
                    }
                }
                for (src, _) in template.adj_transpose(c).row(root) {
                    let other = supernode_of[src];
                    if other != idx && !ins[idx].contains(&other) {
                        ins[idx].push(other);
                    }
                }
            }
            in_nbrs.push(ins);
            out_nbrs.push(outs);
        }

        Self {
            template,
            classes: Arc::new(classes),
            supernodes: Arc::new(supernodes),
            supernode_of: Arc::new(supernode_of),
            in_nbrs: Arc::new(in_nbrs),
            out_nbrs: Arc::new(out_nbrs),
            world,
            candidates,
        }
    }

    /* Accessors */

    #[inline]
    pub fn template(&self) -> &Graph {
        &self.template
    }

    #[inline]
    pub fn world(&self) -> &Graph {
        &self.world
    }

    #[inline]
    pub fn classes(&self) -> &Equivalence {
        &self.classes
    }

    #[inline]
    pub fn candidates(&self) -> &CandidateMatrix {
        &self.candidates
    }

    #[inline]
    pub fn supernodes(&self) -> &SupernodeVec<SuperTemplateNode> {
        &self.supernodes
    }

    #[inline]
    pub fn supernode(&self, idx: SupernodeIdx) -> &SuperTemplateNode {
        &self.supernodes[idx]
    }

    #[inline]
    pub fn supernode_count(&self) -> usize {
        self.supernodes.len()
    }

    /// The supernode holding a given template vertex.
    #[inline]
    pub fn supernode_of_vertex(&self, v: usize) -> SupernodeIdx {
        self.supernode_of[v]
    }

    /// The supernode holding the template node with a given name.
    pub fn supernode_by_name(&self, name: &str) -> Option<SupernodeIdx> {
        self.template.node_idx(name).map(|v| self.supernode_of[v])
    }

    /// Supernodes with a superedge into `sn` in `channel`, excluding `sn` itself.
    #[inline]
    pub fn incoming_neighbors(&self, sn: SupernodeIdx, channel: usize) -> &[SupernodeIdx] {
        &self.in_nbrs[channel][sn]
    }

    /// Supernodes with a superedge out of `sn` in `channel`, excluding `sn` itself.
    #[inline]
    pub fn outgoing_neighbors(&self, sn: SupernodeIdx, channel: usize) -> &[SupernodeIdx] {
        &self.out_nbrs[channel][sn]
    }

    /// The distinct neighbour supernodes of `sn` over every channel and direction.
    pub fn neighbor_supernodes(&self, sn: SupernodeIdx) -> Vec<SupernodeIdx> {
        (0..self.template.n_channels())
            .flat_map(|c| {
                self.in_nbrs[c][sn]
                    .iter()
                    .chain(&self.out_nbrs[c][sn])
                    .copied()
            })
            .sorted()
            .dedup()
            .collect()
    }

    /// Total degree of the supernode's root in the template, over every channel.
    pub fn degree(&self, sn: SupernodeIdx) -> u32 {
        self.template.degree(self.supernodes[sn].root())
    }

    /* Candidate queries */

    /// The number of world nodes still candidate for `sn` (its root row's popcount).
    #[inline]
    pub fn candidate_count(&self, sn: SupernodeIdx) -> usize {
        self.candidates.row_count(self.supernodes[sn].root())
    }

    /// The current candidate world vertices of `sn`, in increasing order.
    pub fn candidate_vertices(&self, sn: SupernodeIdx) -> Vec<usize> {
        self.candidates
            .row_indices(self.supernodes[sn].root())
            .collect()
    }

    /// Lazily enumerates the candidate world supernodes of `sn`: singletons for trivial
    /// supernodes, `|sn|`-subsets of the candidate row otherwise.
    pub fn get_candidates(&self, sn: SupernodeIdx) -> Subsets {
        Subsets::new(self.candidate_vertices(sn), self.supernodes[sn].len())
    }

    /// The multiplicity of the superedge from `a` to `b` in `channel`: the number of parallel
    /// template edges from any member of `a` to any member of `b`.
    #[inline]
    pub fn superedge_multiplicity(&self, a: SupernodeIdx, b: SupernodeIdx, channel: usize) -> u32 {
        self.template
            .adj(channel)
            .get(self.supernodes[a].root(), self.supernodes[b].root())
    }

    /// True iff the superedge from `a` to `b` exists in `channel`.
    pub fn has_super_edge(&self, a: SupernodeIdx, b: SupernodeIdx, channel: usize) -> bool {
        self.superedge_multiplicity(a, b, channel) > 0
    }

    /// The candidate-edge check: with `a` bound to `image_a` and `b` to `image_b`, does the
    /// world carry every edge the superedge from `a` to `b` demands in `channel`?
    ///
    /// Vacuously true when there is no superedge.  Otherwise every ordered pair of world
    /// vertices across the two images must dominate the superedge multiplicity, and the images
    /// must be disjoint.
    pub fn has_cand_edge(
        &self,
        (a, image_a): (SupernodeIdx, &Supernode),
        (b, image_b): (SupernodeIdx, &Supernode),
        channel: usize,
    ) -> bool {
        let required = self.superedge_multiplicity(a, b, channel);
        if required == 0 {
            return true;
        }
        if !image_a.is_disjoint(image_b) {
            return false;
        }
        let adj = self.world.adj(channel);
        image_a
            .vertices()
            .iter()
            .all(|&u| image_b.vertices().iter().all(|&v| adj.get(u, v) >= required))
    }

    /// The clique condition: in every channel where `sn`'s members form a clique, the candidate
    /// image must induce a dominating clique in the world.
    pub fn supernode_clique_and_cand_node_clique(
        &self,
        sn: SupernodeIdx,
        image: &Supernode,
    ) -> bool {
        let supernode = &self.supernodes[sn];
        debug_assert_eq!(supernode.len(), image.len());
        if supernode.is_trivial() {
            return true;
        }
        for c in 0..self.template.n_channels() {
            if !supernode.is_clique(c) {
                continue;
            }
            let template_sub = self.template.adj(c).submatrix(supernode.vertices());
            let world_sub = self.world.adj(c).submatrix(image.vertices());
            if !world_sub.dominates(&template_sub) {
                return false;
            }
        }
        true
    }

    /* Search support */

    /// Restricts the candidate rows of a just-bound supernode to its image.  Returns whether
    /// any bit actually changed; when nothing changed, the caller can skip re-filtering.
    pub fn update_candidates(&mut self, sn: SupernodeIdx, image: &Supernode) -> bool {
        let vertices: Vec<usize> = self.supernodes[sn].vertices().to_vec();
        self.candidates.bind_rows(&vertices, image)
    }

    /// Runs the cheap filters on the frame-local matrix.  Returns the number of bits cleared.
    pub fn run_cheap_filters(&mut self) -> usize {
        filters::run_to_fixpoint(
            &self.template,
            &self.world,
            &mut self.candidates,
            FilterSet::Cheap,
        )
    }

    /// The class Hall prerequisite: every supernode must retain at least as many candidates as
    /// it has members.
    pub fn check_satisfiability(&self) -> bool {
        self.supernodes
            .iter_enumerated()
            .all(|(idx, sn)| self.candidate_count(idx) >= sn.len())
    }
}

impl std::fmt::Debug for CandidateStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CandidateStructure({} supernodes over {:?} / {:?})",
            self.supernode_count(),
            self.template,
            self.world,
        )
    }
}
