//! Multi-value compressed storage (RCM and CCM).
//!
//! Each line keeps parallel index/value arrays that may hold the same index
//! several times, in any order, so contributions can be appended while a
//! matrix is assembled. Reads sum the duplicates; [`canonicalize`] merges them.
//!
//! [`canonicalize`]: MultiCompressedMatrix::canonicalize

use crate::core::kernel::{accumulate, check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::sparse::{CompressedMatrix, Orientation};
use crate::matrix::vector::SparseVector;
use crate::parallel::KernelConfig;

/// One compressed line: indices and values of its entries.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseLine<T> {
    pub idx: Vec<usize>,
    pub vals: Vec<T>,
}

impl<T> SparseLine<T> {
    pub fn new() -> Self {
        Self { idx: Vec::new(), vals: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.idx.iter().copied().zip(&self.vals)
    }
}

impl<T> Default for SparseLine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseLine<T> {
    fn push(&mut self, k: usize, v: T) {
        self.idx.push(k);
        self.vals.push(v);
    }

    /// Sum of every entry at index `k`.
    fn sum_at(&self, k: usize) -> T {
        self.iter().filter(|(i, _)| *i == k).fold(T::zero(), |acc, (_, &v)| acc + v)
    }

    fn remove_all(&mut self, k: usize) {
        let mut w = 0;
        for r in 0..self.idx.len() {
            if self.idx[r] != k {
                self.idx[w] = self.idx[r];
                self.vals[w] = self.vals[r];
                w += 1;
            }
        }
        self.idx.truncate(w);
        self.vals.truncate(w);
    }

    /// Sorts by index, sums duplicates and drops zero sums.
    fn canonicalize(&mut self) {
        let mut pairs: Vec<(usize, T)> = self.idx.iter().copied().zip(self.vals.iter().copied()).collect();
        pairs.sort_by_key(|p| p.0);
        self.idx.clear();
        self.vals.clear();
        for (k, v) in pairs {
            match self.idx.last() {
                Some(&last) if last == k => {
                    let tail = self.vals.len() - 1;
                    self.vals[tail] = self.vals[tail] + v;
                }
                _ => self.push(k, v),
            }
        }
        self.remove_all_zeros();
    }

    fn remove_all_zeros(&mut self) {
        let mut w = 0;
        for r in 0..self.idx.len() {
            if self.vals[r] != T::zero() {
                self.idx[w] = self.idx[r];
                self.vals[w] = self.vals[r];
                w += 1;
            }
        }
        self.idx.truncate(w);
        self.vals.truncate(w);
    }

    fn is_canonical(&self) -> bool {
        self.idx.windows(2).all(|w| w[0] < w[1]) && self.vals.iter().all(|v| *v != T::zero())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiCompressedMatrix<T> {
    rows: usize,
    cols: usize,
    orientation: Orientation,
    lines: Vec<SparseLine<T>>,
}

impl<T: Scalar> MultiCompressedMatrix<T> {
    pub fn new(rows: usize, cols: usize, orientation: Orientation) -> Self {
        let n = match orientation {
            Orientation::Row => rows,
            Orientation::Column => cols,
        };
        Self { rows, cols, orientation, lines: vec![SparseLine::new(); n] }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    fn line_and_index(&self, i: usize, j: usize) -> (usize, usize) {
        match self.orientation {
            Orientation::Row => (i, j),
            Orientation::Column => (j, i),
        }
    }

    /// Appends a contribution at `(i, j)`; earlier ones are kept.
    pub fn push(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        self.check_bounds(i, j)?;
        if value != T::zero() {
            let (l, k) = self.line_and_index(i, j);
            self.lines[l].push(k, value);
        }
        Ok(())
    }

    pub fn line(&self, l: usize) -> &SparseLine<T> {
        &self.lines[l]
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of stored entries, duplicates included.
    pub fn stored(&self) -> usize {
        self.lines.iter().map(SparseLine::len).sum()
    }

    pub fn canonicalize(&mut self) {
        self.lines.iter_mut().for_each(SparseLine::canonicalize);
    }

    pub fn is_canonical(&self) -> bool {
        self.lines.iter().all(SparseLine::is_canonical)
    }

    /// Canonical single-value copy with the same orientation.
    pub fn to_compressed(&self) -> CompressedMatrix<T> {
        let mut ptr = Vec::with_capacity(self.lines.len() + 1);
        let mut idx = Vec::new();
        let mut vals = Vec::new();
        ptr.push(0);
        for line in &self.lines {
            let mut merged = line.clone();
            merged.canonicalize();
            idx.extend_from_slice(&merged.idx);
            vals.extend_from_slice(&merged.vals);
            ptr.push(idx.len());
        }
        CompressedMatrix::from_canonical(self.rows, self.cols, self.orientation, ptr, idx, vals)
    }
}

impl<T> MatShape for MultiCompressedMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for MultiCompressedMatrix<T> {
    type Like = MultiCompressedMatrix<T>;
    type Like1D = SparseVector<T>;

    fn get_quick(&self, i: usize, j: usize) -> T {
        let (l, k) = self.line_and_index(i, j);
        self.lines[l].sum_at(k)
    }

    /// Replaces every contribution at `(i, j)` with `value`.
    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        let (l, k) = self.line_and_index(i, j);
        let line = &mut self.lines[l];
        line.remove_all(k);
        if value != T::zero() {
            line.push(k, value);
        }
        Ok(())
    }

    fn like(&self, rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, self.orientation)
    }

    fn like_1d(&self, size: usize) -> SparseVector<T> {
        SparseVector::new(size)
    }

    /// Visits each stored contribution; duplicates are visited separately.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for (l, line) in self.lines.iter().enumerate() {
            for (k, &v) in line.iter() {
                match self.orientation {
                    Orientation::Row => f(l, k, v),
                    Orientation::Column => f(k, l, v),
                }
            }
        }
    }

    fn cardinality(&self) -> usize {
        self.to_compressed().nnz()
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
        check_mult_shapes(self, x, y, transpose)?;
        prepare_output(y, beta)?;
        let gather = (self.orientation == Orientation::Row) != transpose;
        for (l, line) in self.lines.iter().enumerate() {
            if gather {
                let s = line.iter().fold(T::zero(), |acc, (k, &v)| acc + v * x.get_quick(k));
                accumulate(y, l, alpha * s)?;
            } else {
                let xl = x.get_quick(l);
                if xl != T::zero() {
                    for (k, &v) in line.iter() {
                        accumulate(y, k, alpha * v * xl)?;
                    }
                }
            }
        }
        Ok(())
    }
}
