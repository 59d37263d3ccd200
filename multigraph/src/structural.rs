//! Structural equivalence of graph nodes.
//!
//! Two nodes `i` and `j` are *structurally equivalent* when swapping them (and touching nothing
//! else) is an automorphism of the graph: for every channel they must have identical rows and
//! columns away from the pair, symmetric multiplicity within the pair, and equal self-loop
//! counts.  Equivalent nodes are interchangeable in any isomorphism, so a matcher can bind a
//! whole class at once and recover the true count combinatorially.
//!
//! The partitioner below is the simple quadratic one: it grows classes by pairwise checks
//! against representatives.  That is plenty for template graphs, which are small; the pairwise
//! check itself is also used on (filtered) world candidate sets, where the caller pre-buckets by
//! degree profile first.

use crate::{Equivalence, Graph};

/// True iff swapping `i` and `j` (fixing every other node) is an automorphism of `g`.
///
/// Concretely, for every channel `c`:
/// - `A_c[i, k] == A_c[j, k]` and `A_c[k, i] == A_c[k, j]` for every `k` outside `{i, j}`,
/// - `A_c[i, j] == A_c[j, i]`, and
/// - `A_c[i, i] == A_c[j, j]`.
pub fn structurally_equivalent(g: &Graph, i: usize, j: usize) -> bool {
    if i == j {
        return true;
    }
    for c in 0..g.n_channels() {
        let adj = g.adj(c);
        if adj.get(i, j) != adj.get(j, i) || adj.get(i, i) != adj.get(j, j) {
            return false;
        }
        if !rows_equal_outside_pair(adj.row(i), adj.row(j), i, j)
            || !rows_equal_outside_pair(g.adj_transpose(c).row(i), g.adj_transpose(c).row(j), i, j)
        {
            return false;
        }
    }
    true
}

/// Compares two sparse rows for equality, ignoring the columns `i` and `j`.
fn rows_equal_outside_pair(
    row_i: impl Iterator<Item = (usize, u32)>,
    row_j: impl Iterator<Item = (usize, u32)>,
    i: usize,
    j: usize,
) -> bool {
    let mut a = row_i.filter(|&(col, _)| col != i && col != j);
    let mut b = row_j.filter(|&(col, _)| col != i && col != j);
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x == y => continue,
            _ => return false,
        }
    }
}

/// Partitions the nodes of `g` into structural-equivalence classes.
pub fn structural_partition(g: &Graph) -> Equivalence {
    let all: Vec<usize> = (0..g.n_nodes()).collect();
    Equivalence::from_classes(structural_classes(g, &all))
}

/// Groups `nodes` into classes of pairwise structurally-equivalent nodes of `g`.
///
/// The relation is transitive, so greedy grouping against one representative per class is exact.
pub fn structural_classes(g: &Graph, nodes: &[usize]) -> Vec<Vec<usize>> {
    // Bucket by a cheap invariant first so the pairwise check only runs within buckets
    let mut buckets: std::collections::BTreeMap<Vec<u32>, Vec<usize>> = Default::default();
    for &i in nodes {
        let mut profile = Vec::with_capacity(3 * g.n_channels());
        for c in 0..g.n_channels() {
            profile.push(g.in_degrees(c)[i]);
            profile.push(g.out_degrees(c)[i]);
            profile.push(g.self_loops(c)[i]);
        }
        buckets.entry(profile).or_default().push(i);
    }

    let mut classes: Vec<Vec<usize>> = Vec::new();
    for bucket in buckets.into_values() {
        let mut bucket_classes: Vec<Vec<usize>> = Vec::new();
        for i in bucket {
            match bucket_classes
                .iter_mut()
                .find(|class| structurally_equivalent(g, class[0], i))
            {
                Some(class) => class.push(i),
                None => bucket_classes.push(vec![i]),
            }
        }
        classes.extend(bucket_classes);
    }
    for class in &mut classes {
        class.sort_unstable();
    }
    classes.sort_unstable();
    classes
}
