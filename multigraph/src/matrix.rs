//! A compact sparse matrix of nonnegative integer entries, stored in CSR form.
//!
//! This is deliberately a small, dedicated module: the matcher only needs adjacency lookups,
//! row/column sums, transposition and induced submatrices, so we implement exactly those rather
//! than pulling in a general linear algebra library.

use std::fmt::{Debug, Formatter};

/// A sparse matrix of `u32` entries in compressed sparse row format.
///
/// **Invariants**: column indices within each row are strictly increasing, and no explicit zero
/// entries are stored.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    /// `row_starts[r]..row_starts[r + 1]` is the slice of `cols`/`vals` holding row `r`.
    row_starts: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<u32>,
}

impl CsrMatrix {
    /// Creates a matrix with no non-zero entries.
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_starts: vec![0; n_rows + 1],
            cols: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Builds a matrix from `(row, col, value)` triplets.  Duplicate coordinates are summed,
    /// which makes this the natural way to accumulate parallel edges into multiplicities.
    ///
    /// # Panics
    ///
    /// Panics if any coordinate is outside `n_rows x n_cols`.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, u32)>,
    ) -> Self {
        let mut entries: Vec<(usize, usize, u32)> = triplets
            .into_iter()
            .inspect(|&(r, c, _)| {
                assert!(r < n_rows && c < n_cols, "triplet ({r}, {c}) out of bounds");
            })
            .filter(|&(_, _, v)| v > 0)
            .collect();
        entries.sort_unstable_by_key(|&(r, c, _)| (r, c));
        // Merge runs of entries sharing a coordinate
        entries.dedup_by(|next, prev| {
            if (prev.0, prev.1) == (next.0, next.1) {
                prev.2 += next.2;
                true
            } else {
                false
            }
        });

        let mut matrix = Self::zeros(n_rows, n_cols);
        matrix.cols.reserve(entries.len());
        matrix.vals.reserve(entries.len());
        for (r, c, v) in entries {
            matrix.cols.push(c);
            matrix.vals.push(v);
            matrix.row_starts[r + 1] = matrix.cols.len();
        }
        // Empty rows inherit the previous row's end offset
        for r in 1..=n_rows {
            if matrix.row_starts[r] < matrix.row_starts[r - 1] {
                matrix.row_starts[r] = matrix.row_starts[r - 1];
            }
        }
        matrix
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// The number of stored (non-zero) entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.cols.len()
    }

    /// The entry at `(row, col)`, or 0 if it isn't stored.
    pub fn get(&self, row: usize, col: usize) -> u32 {
        let slice = self.row_slice(row);
        match self.cols[slice.clone()].binary_search(&col) {
            Ok(offset) => self.vals[slice.start + offset],
            Err(_) => 0,
        }
    }

    /// Iterates over the non-zero `(col, value)` pairs of one row, in increasing column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        let slice = self.row_slice(row);
        self.cols[slice.clone()]
            .iter()
            .copied()
            .zip(self.vals[slice].iter().copied())
    }

    /// Iterates over every non-zero entry as `(row, col, value)`.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        (0..self.n_rows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    /// Sum of every entry in each row (out-degrees when `self` is an adjacency matrix).
    pub fn row_sums(&self) -> Vec<u32> {
        (0..self.n_rows)
            .map(|r| self.row(r).map(|(_, v)| v).sum())
            .collect()
    }

    /// Sum of every entry in each column (in-degrees when `self` is an adjacency matrix).
    pub fn col_sums(&self) -> Vec<u32> {
        let mut sums = vec![0u32; self.n_cols];
        for (_, c, v) in self.entries() {
            sums[c] += v;
        }
        sums
    }

    /// The main diagonal (self-loop counts when `self` is an adjacency matrix).
    ///
    /// # Panics
    ///
    /// Panics if the matrix isn't square.
    pub fn diagonal(&self) -> Vec<u32> {
        assert_eq!(self.n_rows, self.n_cols, "diagonal of a non-square matrix");
        (0..self.n_rows).map(|i| self.get(i, i)).collect()
    }

    /// Returns the transposed matrix.
    pub fn transpose(&self) -> Self {
        Self::from_triplets(
            self.n_cols,
            self.n_rows,
            self.entries().map(|(r, c, v)| (c, r, v)),
        )
    }

    /// Element-wise sum of two matrices of the same shape.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn add(&self, other: &Self) -> Self {
        assert_eq!(
            (self.n_rows, self.n_cols),
            (other.n_rows, other.n_cols),
            "adding matrices of different shapes"
        );
        Self::from_triplets(
            self.n_rows,
            self.n_cols,
            self.entries().chain(other.entries()),
        )
    }

    /// The square submatrix induced by `idxs`: entry `(i, j)` of the result is
    /// `self[idxs[i], idxs[j]]`.
    ///
    /// # Panics
    ///
    /// Panics if the matrix isn't square or an index is out of bounds.
    pub fn submatrix(&self, idxs: &[usize]) -> Self {
        assert_eq!(self.n_rows, self.n_cols, "submatrix of a non-square matrix");
        let mut new_idx = vec![usize::MAX; self.n_cols];
        for (new, &old) in idxs.iter().enumerate() {
            new_idx[old] = new;
        }
        Self::from_triplets(
            idxs.len(),
            idxs.len(),
            idxs.iter().enumerate().flat_map(|(new_r, &old_r)| {
                let new_idx = &new_idx;
                self.row(old_r).filter_map(move |(c, v)| {
                    (new_idx[c] != usize::MAX).then(|| (new_r, new_idx[c], v))
                })
            }),
        )
    }

    /// True iff every entry of `other` is `<=` the corresponding entry of `self`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn dominates(&self, other: &Self) -> bool {
        assert_eq!(
            (self.n_rows, self.n_cols),
            (other.n_rows, other.n_cols),
            "comparing matrices of different shapes"
        );
        other.entries().all(|(r, c, v)| self.get(r, c) >= v)
    }

    #[inline]
    fn row_slice(&self, row: usize) -> std::ops::Range<usize> {
        assert!(row < self.n_rows, "row {row} out of bounds");
        self.row_starts[row]..self.row_starts[row + 1]
    }
}

impl Debug for CsrMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CsrMatrix({}x{}; ", self.n_rows, self.n_cols)?;
        let mut first = true;
        for (r, c, v) in self.entries() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "[{r},{c}]={v}")?;
            first = false;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> CsrMatrix {
        CsrMatrix::from_triplets(3, 3, vec![(0, 1, 2), (1, 2, 1), (2, 0, 3), (2, 2, 1)])
    }

    #[test]
    fn get_and_nnz() {
        let m = example();
        assert_eq!(m.get(0, 1), 2);
        assert_eq!(m.get(1, 2), 1);
        assert_eq!(m.get(0, 0), 0);
        assert_eq!(m.nnz(), 4);
    }

    #[test]
    fn duplicate_triplets_accumulate() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1), (0, 1, 1), (0, 1, 2)]);
        assert_eq!(m.get(0, 1), 4);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn zero_triplets_are_dropped() {
        let m = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 0), (1, 1, 5)]);
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.get(1, 1), 5);
    }

    #[test]
    fn sums_and_diagonal() {
        let m = example();
        assert_eq!(m.row_sums(), vec![2, 1, 4]);
        assert_eq!(m.col_sums(), vec![3, 2, 2]);
        assert_eq!(m.diagonal(), vec![0, 0, 1]);
    }

    #[test]
    fn transpose_round_trips() {
        let m = example();
        let t = m.transpose();
        assert_eq!(t.get(1, 0), 2);
        assert_eq!(t.get(0, 2), 3);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn add_merges_entries() {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1), (0, 1, 1)]);
        let b = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 2), (1, 1, 1)]);
        let sum = a.add(&b);
        assert_eq!(sum.get(0, 0), 1);
        assert_eq!(sum.get(0, 1), 3);
        assert_eq!(sum.get(1, 1), 1);
    }

    #[test]
    fn submatrix_induces() {
        let m = example();
        let sub = m.submatrix(&[0, 2]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.get(1, 0), 3); // old [2, 0]
        assert_eq!(sub.get(1, 1), 1); // old [2, 2]
        assert_eq!(sub.get(0, 1), 0); // old [0, 2]
    }

    #[test]
    fn dominance() {
        let small = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 1)]);
        let big = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 2), (1, 0, 1)]);
        assert!(big.dominates(&small));
        assert!(!small.dominates(&big));
    }
}
