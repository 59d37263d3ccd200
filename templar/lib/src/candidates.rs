//! The candidate matrix: which world nodes are still viable images of each template node.
//!
//! `M[t, w]` is a single bit; filters and the matcher only ever *clear* bits, so the matrix
//! shrinks monotonically along any search path.  Rows belonging to the same template
//! equivalence class are kept identical by writing through every member of the class
//! ([`CandidateMatrix::bind_rows`]).

use bit_vec::BitVec;

use crate::supernode::Supernode;

/// A boolean `n_template x n_world` matrix, one [`BitVec`] per template node.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateMatrix {
    rows: Vec<BitVec>,
    n_world: usize,
}

impl CandidateMatrix {
    /// The all-ones matrix: every world node is a candidate for every template node.
    pub fn full(n_template: usize, n_world: usize) -> Self {
        Self {
            rows: vec![BitVec::from_elem(n_world, true); n_template],
            n_world,
        }
    }

    #[inline]
    pub fn n_template(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_world(&self) -> usize {
        self.n_world
    }

    #[inline]
    pub fn is_candidate(&self, t: usize, w: usize) -> bool {
        self.rows[t][w]
    }

    /// Clears one bit; returns whether it was set.
    pub fn clear(&mut self, t: usize, w: usize) -> bool {
        let was_set = self.rows[t][w];
        if was_set {
            self.rows[t].set(w, false);
        }
        was_set
    }

    /// The number of candidates left for template node `t`.
    pub fn row_count(&self, t: usize) -> usize {
        self.rows[t].blocks().map(|b| b.count_ones() as usize).sum()
    }

    /// Iterates over the world nodes still candidate for `t`, in increasing order.
    pub fn row_indices(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows[t]
            .iter()
            .enumerate()
            .filter_map(|(w, set)| set.then_some(w))
    }

    /// Restricts the rows of every template vertex in `template_vertices` to exactly the world
    /// vertices of `image`.  Returns whether any bit changed.
    ///
    /// This is the matcher binding a supernode: all rows of one template class are written
    /// together, which is what keeps equivalent rows identical.
    pub fn bind_rows(&mut self, template_vertices: &[usize], image: &Supernode) -> bool {
        let mut indicator = BitVec::from_elem(self.n_world, false);
        for &w in image.vertices() {
            indicator.set(w, true);
        }
        let mut changed = false;
        for &t in template_vertices {
            if self.rows[t] != indicator {
                self.rows[t] = indicator.clone();
                changed = true;
            }
        }
        changed
    }

    /// Clears the column of one world node (it is no longer a candidate for anything).
    pub fn clear_world_node(&mut self, w: usize) {
        for row in &mut self.rows {
            row.set(w, false);
        }
    }

    /// True iff `w` is a candidate for at least one template node.
    pub fn is_candidate_for_any(&self, w: usize) -> bool {
        self.rows.iter().any(|row| row[w])
    }

    /// The first template node with an empty row, if any.  An empty row means the instance is
    /// unsatisfiable.
    pub fn first_empty_row(&self) -> Option<usize> {
        self.rows.iter().position(BitVec::none)
    }

    /// Total number of set bits.  Filters report progress as the drop in this count.
    pub fn count_ones(&self) -> usize {
        (0..self.n_template()).map(|t| self.row_count(t)).sum()
    }

    /// Rebuilds the matrix over a compacted world: column `i` of the result is column
    /// `keep[i]` of `self`.
    pub fn compact_world(&self, keep: &[usize]) -> CandidateMatrix {
        let rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&w| row[w]).collect())
            .collect();
        CandidateMatrix {
            rows,
            n_world: keep.len(),
        }
    }
}

impl std::fmt::Debug for CandidateMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CandidateMatrix({}x{}):", self.n_template(), self.n_world)?;
        for row in &self.rows {
            for bit in row.iter() {
                write!(f, "{}", if bit { '1' } else { '0' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Lazily enumerates the `k`-subsets of a sorted item list, in lexicographic order, as
/// [`Supernode`]s.  Yields nothing when fewer than `k` items are available, which is the popcount
/// cut-off that keeps non-trivial supernodes cheap when their candidate rows run dry.
pub struct Subsets {
    items: Vec<usize>,
    k: usize,
    /// Positions into `items` of the subset to yield next; `None` before the first call.
    positions: Option<Vec<usize>>,
    exhausted: bool,
}

impl Subsets {
    pub fn new(items: Vec<usize>, k: usize) -> Self {
        let exhausted = k == 0 || items.len() < k;
        Self {
            items,
            k,
            positions: None,
            exhausted,
        }
    }
}

impl Iterator for Subsets {
    type Item = Supernode;

    fn next(&mut self) -> Option<Supernode> {
        if self.exhausted {
            return None;
        }
        match &mut self.positions {
            None => {
                self.positions = Some((0..self.k).collect());
            }
            Some(positions) => {
                // Advance the rightmost position which still has headroom
                let n = self.items.len();
                let mut idx = self.k;
                loop {
                    if idx == 0 {
                        self.exhausted = true;
                        return None;
                    }
                    idx -= 1;
                    if positions[idx] < n - self.k + idx {
                        positions[idx] += 1;
                        for later in idx + 1..self.k {
                            positions[later] = positions[later - 1] + 1;
                        }
                        break;
                    }
                }
            }
        }
        let positions = self.positions.as_ref().unwrap();
        Some(Supernode::new(positions.iter().map(|&p| self.items[p])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_matrix() {
        let m = CandidateMatrix::full(2, 3);
        assert_eq!(m.row_count(0), 3);
        assert!(m.is_candidate(1, 2));
        assert_eq!(m.first_empty_row(), None);
    }

    #[test]
    fn clearing_bits() {
        let mut m = CandidateMatrix::full(2, 3);
        assert!(m.clear(0, 1));
        assert!(!m.clear(0, 1)); // already cleared
        assert_eq!(m.row_count(0), 2);
        assert_eq!(m.row_indices(0).collect::<Vec<_>>(), vec![0, 2]);

        m.clear(0, 0);
        m.clear(0, 2);
        assert_eq!(m.first_empty_row(), Some(0));
    }

    #[test]
    fn binding_rows() {
        let mut m = CandidateMatrix::full(3, 4);
        let image = Supernode::new(vec![1, 3]);
        assert!(m.bind_rows(&[0, 2], &image));
        assert_eq!(m.row_indices(0).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(m.row_indices(2).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(m.row_count(1), 4); // untouched row

        // Re-binding the same image changes nothing
        assert!(!m.bind_rows(&[0, 2], &image));
    }

    #[test]
    fn world_column_operations() {
        let mut m = CandidateMatrix::full(2, 3);
        m.clear_world_node(1);
        assert!(!m.is_candidate(0, 1));
        assert!(!m.is_candidate_for_any(1));
        assert!(m.is_candidate_for_any(0));

        let compact = m.compact_world(&[0, 2]);
        assert_eq!(compact.n_world(), 2);
        assert_eq!(compact.row_count(0), 2);
    }

    fn subsets(items: Vec<usize>, k: usize) -> Vec<Vec<usize>> {
        Subsets::new(items, k)
            .map(|sn| sn.vertices().to_vec())
            .collect()
    }

    #[test]
    fn subsets_enumerate_lexicographically() {
        assert_eq!(
            subsets(vec![2, 5, 7], 2),
            vec![vec![2, 5], vec![2, 7], vec![5, 7]]
        );
        assert_eq!(subsets(vec![1, 2, 3], 3), vec![vec![1, 2, 3]]);
        assert_eq!(subsets(vec![4], 1), vec![vec![4]]);
    }

    #[test]
    fn subsets_cut_off_when_too_few_items() {
        assert_eq!(subsets(vec![1, 2], 3), Vec::<Vec<usize>>::new());
        assert_eq!(subsets(vec![], 1), Vec::<Vec<usize>>::new());
    }
}
