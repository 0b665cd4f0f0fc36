//! Coordinate (triplet) storage.

use crate::core::kernel::scatter_mult;
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::sparse::{CompressedMatrix, Orientation};
use crate::matrix::vector::SparseVector;
use crate::parallel::KernelConfig;

/// Unordered `(row, col, value)` entries; duplicates add up on read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TripletMatrix<T> {
    rows: usize,
    cols: usize,
    entries: Vec<(usize, usize, T)>,
}

impl<T: Scalar> TripletMatrix<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_capacity(rows, cols, 0)
    }

    pub fn with_capacity(rows: usize, cols: usize, nnz: usize) -> Self {
        Self { rows, cols, entries: Vec::with_capacity(nnz) }
    }

    /// Appends an entry; an existing entry at `(i, j)` is kept and added to.
    pub fn push(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        self.check_bounds(i, j)?;
        if value != T::zero() {
            self.entries.push((i, j, value));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[(usize, usize, T)] {
        &self.entries
    }

    /// Canonical compressed copy; duplicates are summed and zero sums dropped.
    pub fn to_compressed(&self, orientation: Orientation) -> CompressedMatrix<T> {
        let key = |&(i, j, _): &(usize, usize, T)| match orientation {
            Orientation::Row => (i, j),
            Orientation::Column => (j, i),
        };
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(key);
        let lines = match orientation {
            Orientation::Row => self.rows,
            Orientation::Column => self.cols,
        };
        let mut ptr = vec![0usize; lines + 1];
        let mut idx = Vec::with_capacity(sorted.len());
        let mut vals: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for e in &sorted {
            let (l, k) = key(e);
            if last == Some((l, k)) {
                let tail = vals.len() - 1;
                vals[tail] = vals[tail] + e.2;
            } else {
                // Fold away a previous sum that cancelled out.
                if vals.last().is_some_and(|v| *v == T::zero()) {
                    vals.pop();
                    idx.pop();
                    if let Some((pl, _)) = last {
                        ptr[pl + 1] -= 1;
                    }
                }
                idx.push(k);
                vals.push(e.2);
                ptr[l + 1] += 1;
                last = Some((l, k));
            }
        }
        if vals.last().is_some_and(|v| *v == T::zero()) {
            vals.pop();
            idx.pop();
            if let Some((pl, _)) = last {
                ptr[pl + 1] -= 1;
            }
        }
        for l in 0..lines {
            ptr[l + 1] += ptr[l];
        }
        CompressedMatrix::from_canonical(self.rows, self.cols, orientation, ptr, idx, vals)
    }
}

impl<T> MatShape for TripletMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for TripletMatrix<T> {
    type Like = TripletMatrix<T>;
    type Like1D = SparseVector<T>;

    fn get_quick(&self, i: usize, j: usize) -> T {
        self.entries
            .iter()
            .filter(|e| e.0 == i && e.1 == j)
            .fold(T::zero(), |acc, e| acc + e.2)
    }

    /// Replaces every entry at `(i, j)` with a single one holding `value`.
    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        self.entries.retain(|e| !(e.0 == i && e.1 == j));
        if value != T::zero() {
            self.entries.push((i, j, value));
        }
        Ok(())
    }

    fn like(&self, rows: usize, cols: usize) -> Self {
        Self::new(rows, cols)
    }

    fn like_1d(&self, size: usize) -> SparseVector<T> {
        SparseVector::new(size)
    }

    /// Visits each stored entry; duplicates are visited separately.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for &(i, j, v) in &self.entries {
            f(i, j, v);
        }
    }

    /// Number of distinct non-zero coordinates.
    fn cardinality(&self) -> usize {
        self.to_compressed(Orientation::Row).nnz()
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }

    fn z_mult<X, Y>(
        &self,
        cfg: &KernelConfig,
        x: &X,
        y: &mut Y,
        alpha: T,
        beta: T,
        transpose: bool,
    ) -> Result<(), KError>
    where
        X: Matrix1D<T>,
        Y: Matrix1D<T>,
    {
        let _ = cfg;
        scatter_mult(self, x, y, alpha, beta, transpose)
    }
}
