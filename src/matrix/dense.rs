//! Dense matrices in row- or column-major order.
//!
//! `DenseMatrix` keeps every element in one contiguous buffer and converts
//! to and from `faer::Mat` for interoperability with faer's dense routines.

use crate::core::kernel::{check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;
use faer::Mat;

/// Element order of a dense buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColumnMajor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    layout: Layout,
    data: Vec<T>,
}

impl<T: Scalar> DenseMatrix<T> {
    /// Zero matrix in row-major order.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_layout(rows, cols, Layout::RowMajor)
    }

    /// Zero matrix in column-major order.
    pub fn column_major(rows: usize, cols: usize) -> Self {
        Self::with_layout(rows, cols, Layout::ColumnMajor)
    }

    pub fn with_layout(rows: usize, cols: usize, layout: Layout) -> Self {
        Self { rows, cols, layout, data: vec![T::zero(); rows * cols] }
    }

    /// Construct from raw storage in the given order.
    pub fn from_raw(rows: usize, cols: usize, layout: Layout, data: Vec<T>) -> Result<Self, KError> {
        if data.len() != rows * cols {
            return Err(KError::ShapeMismatch(format!(
                "{} elements supplied for a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, layout, data })
    }

    /// Row-major matrix from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self, KError> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(KError::ShapeMismatch("ragged rows".into()));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::from_raw(rows.len(), cols, Layout::RowMajor, data)
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::new(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                m.put(i, j, f(i, j));
            }
        }
        m
    }

    /// Identity-like matrix: ones on the main diagonal.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Raw buffer in [`layout`](Self::layout) order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        match self.layout {
            Layout::RowMajor => i * self.cols + j,
            Layout::ColumnMajor => j * self.rows + i,
        }
    }

    /// Infallible unchecked write; dense storage accepts every coordinate.
    #[inline]
    pub fn put(&mut self, i: usize, j: usize, value: T) {
        let k = self.offset(i, j);
        self.data[k] = value;
    }

    /// Dot product of row `i` with a contiguous `x` (row-major only).
    #[inline]
    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let row = &self.data[i * self.cols..(i + 1) * self.cols];
        row.iter().zip(x).fold(T::zero(), |acc, (a, b)| acc + *a * *b)
    }
}

impl<T: Scalar + num_traits::Float> DenseMatrix<T> {
    /// Copy a faer matrix into row-major storage.
    pub fn from_faer(m: &Mat<T>) -> Self {
        Self::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)])
    }

    /// Copy into a faer matrix.
    pub fn to_faer(&self) -> Mat<T> {
        Mat::from_fn(self.rows, self.cols, |i, j| self.get_quick(i, j))
    }
}

impl<T> MatShape for DenseMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for DenseMatrix<T> {
    type Like = DenseMatrix<T>;
    type Like1D = DenseVector<T>;

    #[inline]
    fn get_quick(&self, i: usize, j: usize) -> T {
        self.data[self.offset(i, j)]
    }

    #[inline]
    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        self.put(i, j, value);
        Ok(())
    }

    fn like(&self, rows: usize, cols: usize) -> Self {
        Self::with_layout(rows, cols, self.layout)
    }

    fn like_1d(&self, size: usize) -> DenseVector<T> {
        DenseVector::zeros(size)
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }

    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        self.data.fill(value);
        Ok(self)
    }

    fn assign_fn<F: Fn(T) -> T>(&mut self, f: F) -> Result<&mut Self, KError> {
        self.data.iter_mut().for_each(|v| *v = f(*v));
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
        let (m, n) = check_mult_shapes(self, x, y, transpose)?;
        let xs: Vec<T> = match x.as_slice() {
            Some(s) => s.to_vec(),
            None => (0..n).map(|c| x.get_quick(c)).collect(),
        };
        // op(A) walks rows contiguously exactly when it is a row-major A or a
        // transposed column-major A.
        let row_contiguous = (self.layout == Layout::RowMajor) != transpose;
        if row_contiguous && self.layout == Layout::RowMajor {
            let mut sums = vec![T::zero(); m];
            #[cfg(feature = "rayon")]
            {
                use rayon::prelude::*;
                match cfg.pool_for(m * n) {
                    Some(pool) => pool.install(|| {
                        sums.par_iter_mut().enumerate().for_each(|(i, s)| *s = self.row_dot(i, &xs));
                    }),
                    None => sums.iter_mut().enumerate().for_each(|(i, s)| *s = self.row_dot(i, &xs)),
                }
            }
            #[cfg(not(feature = "rayon"))]
            {
                let _ = cfg;
                sums.iter_mut().enumerate().for_each(|(i, s)| *s = self.row_dot(i, &xs));
            }
            prepare_output(y, beta)?;
            for (r, s) in sums.into_iter().enumerate() {
                let cur = y.get_quick(r);
                y.set_quick(r, cur + alpha * s)?;
            }
            return Ok(());
        }
        if row_contiguous {
            // Transposed column-major: column r of A is contiguous.
            prepare_output(y, beta)?;
            for r in 0..m {
                let col = &self.data[r * self.rows..(r + 1) * self.rows];
                let s = col.iter().zip(&xs).fold(T::zero(), |acc, (a, b)| acc + *a * *b);
                let cur = y.get_quick(r);
                y.set_quick(r, cur + alpha * s)?;
            }
            return Ok(());
        }
        // Axpy form over the contiguous lines of the buffer.
        let mut acc = vec![T::zero(); m];
        for c in 0..n {
            let line = &self.data[c * m..(c + 1) * m];
            let xc = xs[c];
            if xc != T::zero() {
                acc.iter_mut().zip(line).for_each(|(s, a)| *s = *s + *a * xc);
            }
        }
        prepare_output(y, beta)?;
        for (r, s) in acc.into_iter().enumerate() {
            let cur = y.get_quick(r);
            y.set_quick(r, cur + alpha * s)?;
        }
        Ok(())
    }
}
