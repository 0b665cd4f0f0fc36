//! Single-diagonal storage.
//!
//! A `DiagonalMatrix` materializes only the entries with `j - i == k` for a
//! fixed offset `k`; every other element reads as zero.

use crate::core::kernel::{accumulate, check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::sparse::{CompressedMatrix, Orientation};
use crate::matrix::vector::SparseVector;
use crate::parallel::KernelConfig;

/// Number of elements on the diagonal with offset `k` of a `rows × cols` matrix.
pub fn diagonal_length(rows: usize, cols: usize, k: isize) -> usize {
    let (rows, cols) = (rows as isize, cols as isize);
    let len = if k >= 0 { rows.min(cols - k) } else { (rows + k).min(cols) };
    len.max(0) as usize
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagonalMatrix<T> {
    rows: usize,
    cols: usize,
    dindex: isize,
    elements: Vec<T>,
}

impl<T: Scalar> DiagonalMatrix<T> {
    /// Zero matrix storing the diagonal at offset `k` (`k > 0` above the main diagonal).
    pub fn new(rows: usize, cols: usize, k: isize) -> Self {
        Self {
            rows,
            cols,
            dindex: k,
            elements: vec![T::zero(); diagonal_length(rows, cols, k)],
        }
    }

    /// Builds the matrix from the diagonal values, first row first.
    pub fn from_values(rows: usize, cols: usize, k: isize, values: Vec<T>) -> Result<Self, KError> {
        let len = diagonal_length(rows, cols, k);
        if values.len() != len {
            return Err(KError::ShapeMismatch(format!(
                "diagonal {} of a {}x{} matrix holds {} elements, got {}",
                k,
                rows,
                cols,
                len,
                values.len()
            )));
        }
        Ok(Self { rows, cols, dindex: k, elements: values })
    }

    pub fn diagonal_index(&self) -> isize {
        self.dindex
    }

    pub fn diagonal_length(&self) -> usize {
        self.elements.len()
    }

    pub fn values(&self) -> &[T] {
        &self.elements
    }

    /// Coordinates of the `t`-th stored element.
    #[inline]
    fn coords(&self, t: usize) -> (usize, usize) {
        if self.dindex >= 0 {
            (t, t + self.dindex as usize)
        } else {
            (t + self.dindex.unsigned_abs(), t)
        }
    }

    /// Position in `elements` of `(i, j)`, if it lies on the stored diagonal.
    #[inline]
    fn slot(&self, i: usize, j: usize) -> Option<usize> {
        if j as isize - i as isize != self.dindex {
            return None;
        }
        let t = if self.dindex >= 0 { i } else { j };
        (t < self.elements.len()).then_some(t)
    }
}

impl<T> MatShape for DiagonalMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for DiagonalMatrix<T> {
    type Like = CompressedMatrix<T>;
    type Like1D = SparseVector<T>;

    fn get_quick(&self, i: usize, j: usize) -> T {
        self.slot(i, j).map_or_else(T::zero, |t| self.elements[t])
    }

    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        match self.slot(i, j) {
            Some(t) => {
                self.elements[t] = value;
                Ok(())
            }
            None if value == T::zero() => Ok(()),
            None => Err(KError::InvalidInput(format!(
                "({}, {}) is off diagonal {}",
                i, j, self.dindex
            ))),
        }
    }

    fn like(&self, rows: usize, cols: usize) -> CompressedMatrix<T> {
        CompressedMatrix::new(rows, cols, Orientation::Row)
    }

    fn like_1d(&self, size: usize) -> SparseVector<T> {
        SparseVector::new(size)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for (t, &v) in self.elements.iter().enumerate() {
            if v != T::zero() {
                let (i, j) = self.coords(t);
                f(i, j, v);
            }
        }
    }

    /// Sets every element of the stored diagonal to `value`.
    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        self.elements.fill(value);
        Ok(self)
    }

    /// Applies `f` to the stored diagonal only.
    fn assign_fn<F: Fn(T) -> T>(&mut self, f: F) -> Result<&mut Self, KError> {
        self.elements.iter_mut().for_each(|v| *v = f(*v));
        Ok(self)
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
        for (t, &v) in self.elements.iter().enumerate() {
            let (i, j) = self.coords(t);
            let (r, c) = if transpose { (j, i) } else { (i, j) };
            accumulate(y, r, alpha * v * x.get_quick(c))?;
        }
        Ok(())
    }
}
