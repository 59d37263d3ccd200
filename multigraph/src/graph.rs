//! The multichannel directed multigraph at the heart of the crate.
//!
//! A [`Graph`] keeps one adjacency matrix per *channel* (edge type); the entry `A_c[i, j]` is the
//! number of parallel edges of channel `c` from node `i` to node `j`.  Quantities derived from the
//! per-channel matrices (composite adjacency, neighbour lists, degree vectors) are computed once
//! and rebuilt whenever a mutating operation touches the matrices, so that readers can rely on
//! them always being consistent.

use std::collections::{HashMap, VecDeque};

use crate::matrix::CsrMatrix;

/// A multichannel directed multigraph with integer edge multiplicities.
#[derive(Clone, PartialEq, Eq)]
pub struct Graph {
    name: String,
    nodes: Vec<String>,
    node_idxs: HashMap<String, usize>,
    channels: Vec<String>,
    /// One square `n_nodes x n_nodes` matrix per channel, parallel to `channels`.
    adjs: Vec<CsrMatrix>,
    labels: Option<Vec<String>>,
    derived: Derived,
}

/// Caches derived from the adjacency matrices.  Recomputed wholesale after any mutation, never
/// patched incrementally.
#[derive(Clone, PartialEq, Eq)]
struct Derived {
    composite_adj: CsrMatrix,
    sym_composite_adj: CsrMatrix,
    /// `neighbors[i]` is the sorted list of `j` with an edge between `i` and `j` in either
    /// direction in any channel.
    neighbors: Vec<Vec<usize>>,
    /// Per-channel transposes of the adjacency matrices (for fast in-neighbour scans).
    adj_transposes: Vec<CsrMatrix>,
    in_degrees: Vec<Vec<u32>>,
    out_degrees: Vec<Vec<u32>>,
    self_loops: Vec<Vec<u32>>,
}

impl Graph {
    /// Creates a graph from node names, channel names and one adjacency matrix per channel.
    ///
    /// # Panics
    ///
    /// Panics if the number of matrices doesn't match the number of channels, if any matrix isn't
    /// square with side `nodes.len()`, or if node names aren't unique.
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<String>,
        channels: Vec<String>,
        adjs: Vec<CsrMatrix>,
    ) -> Self {
        Self::with_labels(name, nodes, channels, adjs, None)
    }

    /// As [`Graph::new`], but attaching one label string per node.
    pub fn with_labels(
        name: impl Into<String>,
        nodes: Vec<String>,
        channels: Vec<String>,
        adjs: Vec<CsrMatrix>,
        labels: Option<Vec<String>>,
    ) -> Self {
        assert_eq!(channels.len(), adjs.len(), "one matrix per channel");
        for adj in &adjs {
            assert_eq!(adj.n_rows(), nodes.len(), "matrix side must match node count");
            assert_eq!(adj.n_cols(), nodes.len(), "adjacency matrices must be square");
        }
        if let Some(labels) = &labels {
            assert_eq!(labels.len(), nodes.len(), "one label per node");
        }
        let node_idxs: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        assert_eq!(node_idxs.len(), nodes.len(), "node names must be unique");

        let derived = Derived::compute(nodes.len(), &adjs);
        Self {
            name: name.into(),
            nodes,
            node_idxs,
            channels,
            adjs,
            labels,
            derived,
        }
    }

    /// A graph on `n` nodes named `"0"`, `"1"`, ...; handy for tests and index-based formats.
    pub fn from_indexed_nodes(
        name: impl Into<String>,
        n_nodes: usize,
        channels: Vec<String>,
        adjs: Vec<CsrMatrix>,
    ) -> Self {
        let nodes = (0..n_nodes).map(|i| i.to_string()).collect();
        Self::new(name, nodes, channels, adjs)
    }

    /* Accessors */

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The position of a node name, if present.
    pub fn node_idx(&self, name: &str) -> Option<usize> {
        self.node_idxs.get(name).copied()
    }

    #[inline]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_idx(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    /// The adjacency matrix of one channel.
    #[inline]
    pub fn adj(&self, channel: usize) -> &CsrMatrix {
        &self.adjs[channel]
    }

    /// The transpose of one channel's adjacency matrix.
    #[inline]
    pub fn adj_transpose(&self, channel: usize) -> &CsrMatrix {
        &self.derived.adj_transposes[channel]
    }

    #[inline]
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /* Derived quantities */

    /// Sum of the adjacency matrices over every channel.
    #[inline]
    pub fn composite_adj(&self) -> &CsrMatrix {
        &self.derived.composite_adj
    }

    /// `composite_adj + composite_adj^T`; non-zero entries mark neighbouring pairs.
    #[inline]
    pub fn sym_composite_adj(&self) -> &CsrMatrix {
        &self.derived.sym_composite_adj
    }

    /// True iff some channel has an edge between `i` and `j` in either direction.
    #[inline]
    pub fn is_nbr(&self, i: usize, j: usize) -> bool {
        self.derived.sym_composite_adj.get(i, j) > 0
    }

    /// The sorted neighbour list of node `i` (either direction, any channel).
    #[inline]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.derived.neighbors[i]
    }

    /// Per-node in-degree (column sums) of one channel.
    #[inline]
    pub fn in_degrees(&self, channel: usize) -> &[u32] {
        &self.derived.in_degrees[channel]
    }

    /// Per-node out-degree (row sums) of one channel.
    #[inline]
    pub fn out_degrees(&self, channel: usize) -> &[u32] {
        &self.derived.out_degrees[channel]
    }

    /// Per-node self-loop counts of one channel.
    #[inline]
    pub fn self_loops(&self, channel: usize) -> &[u32] {
        &self.derived.self_loops[channel]
    }

    /// Total degree of a node across every channel, counting both directions.
    pub fn degree(&self, i: usize) -> u32 {
        (0..self.n_channels())
            .map(|c| self.derived.in_degrees[c][i] + self.derived.out_degrees[c][i])
            .sum()
    }

    /// The number of edges (with multiplicity) in one channel.
    pub fn n_edges(&self, channel: usize) -> u64 {
        self.adjs[channel].entries().map(|(_, _, v)| u64::from(v)).sum()
    }

    /// Iterates over every edge of one channel as `(src, dst, count)`.
    pub fn edges(&self, channel: usize) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.adjs[channel].entries()
    }

    /// True iff the graph is connected when edge directions and channels are ignored.
    /// The empty graph counts as connected.
    pub fn is_connected(&self) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        let mut seen = vec![false; self.n_nodes()];
        let mut queue = VecDeque::new();
        seen[0] = true;
        queue.push_back(0);
        let mut n_seen = 1;
        while let Some(i) = queue.pop_front() {
            for &j in self.neighbors(i) {
                if !seen[j] {
                    seen[j] = true;
                    n_seen += 1;
                    queue.push_back(j);
                }
            }
        }
        n_seen == self.n_nodes()
    }

    /// Nodes with no incident edges in any channel.
    pub fn isolated_nodes(&self) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&i| self.neighbors(i).is_empty() && !self.is_nbr(i, i))
            .collect()
    }

    /* Mutation */

    /// Adds `count` parallel edges of `channel` from `src` to `dst`, rebuilding derived caches.
    pub fn add_edge(&mut self, channel: usize, src: usize, dst: usize, count: u32) {
        let extra = CsrMatrix::from_triplets(
            self.n_nodes(),
            self.n_nodes(),
            std::iter::once((src, dst, count)),
        );
        self.adjs[channel] = self.adjs[channel].add(&extra);
        self.derived = Derived::compute(self.n_nodes(), &self.adjs);
    }

    /// Removes `count` parallel edges of `channel` from `src` to `dst`.
    ///
    /// Returns an error if fewer than `count` such edges exist.
    pub fn remove_edge(
        &mut self,
        channel: usize,
        src: usize,
        dst: usize,
        count: u32,
    ) -> Result<(), NotEnoughEdges> {
        let current = self.adjs[channel].get(src, dst);
        if current < count {
            return Err(NotEnoughEdges {
                src,
                dst,
                present: current,
                requested: count,
            });
        }
        self.adjs[channel] = CsrMatrix::from_triplets(
            self.n_nodes(),
            self.n_nodes(),
            self.adjs[channel].entries().map(|(r, c, v)| {
                if (r, c) == (src, dst) {
                    (r, c, v - count)
                } else {
                    (r, c, v)
                }
            }),
        );
        self.derived = Derived::compute(self.n_nodes(), &self.adjs);
        Ok(())
    }

    /// The subgraph induced by `node_idxs` (in the given order), keeping names and labels.
    pub fn subgraph(&self, node_idxs: &[usize]) -> Graph {
        let nodes = node_idxs.iter().map(|&i| self.nodes[i].clone()).collect();
        let labels = self
            .labels
            .as_ref()
            .map(|ls| node_idxs.iter().map(|&i| ls[i].clone()).collect());
        let adjs = self.adjs.iter().map(|adj| adj.submatrix(node_idxs)).collect();
        Graph::with_labels(self.name.clone(), nodes, self.channels.clone(), adjs, labels)
    }
}

impl Derived {
    fn compute(n_nodes: usize, adjs: &[CsrMatrix]) -> Self {
        let composite_adj = adjs
            .iter()
            .fold(CsrMatrix::zeros(n_nodes, n_nodes), |acc, adj| acc.add(adj));
        let sym_composite_adj = composite_adj.add(&composite_adj.transpose());
        let neighbors = (0..n_nodes)
            .map(|i| sym_composite_adj.row(i).map(|(j, _)| j).collect())
            .collect();
        Self {
            adj_transposes: adjs.iter().map(CsrMatrix::transpose).collect(),
            in_degrees: adjs.iter().map(CsrMatrix::col_sums).collect(),
            out_degrees: adjs.iter().map(CsrMatrix::row_sums).collect(),
            self_loops: adjs.iter().map(CsrMatrix::diagonal).collect(),
            composite_adj,
            sym_composite_adj,
            neighbors,
        }
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph({:?}; {} nodes, channels {:?})",
            self.name,
            self.n_nodes(),
            self.channels
        )
    }
}

/// Error returned by [`Graph::remove_edge`] when removing more parallel edges than exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotEnoughEdges {
    pub src: usize,
    pub dst: usize,
    pub present: u32,
    pub requested: u32,
}

impl std::fmt::Display for NotEnoughEdges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "can't remove {} edges from {} -> {}: only {} present",
            self.requested, self.src, self.dst, self.present
        )
    }
}

impl std::error::Error for NotEnoughEdges {}
