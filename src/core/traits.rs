//! Core storage traits for krylith.
//!
//! Every layout (dense, dense-large, diagonal, triplet, compressed, and the
//! views over them) implements [`Matrix2D`] or [`Matrix1D`]. Algorithms are
//! written once against these traits; layout-specific behaviour lives in the
//! methods each layout overrides (notably [`Matrix2D::z_mult`]).

use crate::core::kernel::{check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::error::KError;
use crate::matrix::dense::DenseMatrix;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;

/// Shape of a two-dimensional storage.
pub trait MatShape {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
}

/// Uniform indexing into vectors (dense, sparse or views).
pub trait Indexing {
    /// Number of elements.
    fn size(&self) -> usize;
}

/// One-dimensional storage.
pub trait Matrix1D<T: Scalar>: Indexing {
    /// Storage type produced by [`like`](Matrix1D::like) and [`copy`](Matrix1D::copy).
    type Like: Matrix1D<T>;

    /// Reads element `i` without bounds checking beyond the backing store's own.
    fn get_quick(&self, i: usize) -> T;

    /// Writes element `i` without checking `i` against `size()`.
    fn set_quick(&mut self, i: usize, value: T) -> Result<(), KError>;

    /// New zero-filled storage of a compatible layout.
    fn like(&self, size: usize) -> Self::Like;

    /// Contiguous element buffer, if the layout has one.
    fn as_slice(&self) -> Option<&[T]> {
        None
    }

    /// Mutable contiguous element buffer, if the layout has one.
    fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        None
    }

    fn get(&self, i: usize) -> Result<T, KError> {
        if i >= self.size() {
            return Err(KError::out_of_bounds_1d(i, self.size()));
        }
        Ok(self.get_quick(i))
    }

    fn set(&mut self, i: usize, value: T) -> Result<(), KError> {
        if i >= self.size() {
            return Err(KError::out_of_bounds_1d(i, self.size()));
        }
        self.set_quick(i, value)
    }

    /// Calls `f(i, value)` for every non-zero element, in increasing index order.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, T)) {
        for i in 0..self.size() {
            let v = self.get_quick(i);
            if v != T::zero() {
                f(i, v);
            }
        }
    }

    /// Number of non-zero elements.
    fn cardinality(&self) -> usize {
        let mut n = 0;
        self.for_each_nonzero(&mut |_, _| n += 1);
        n
    }

    /// Deep copy of the (possibly viewed) values into independent storage.
    fn copy(&self) -> Result<Self::Like, KError> {
        let mut out = self.like(self.size());
        let mut status = Ok(());
        self.for_each_nonzero(&mut |i, v| {
            if status.is_ok() {
                status = out.set_quick(i, v);
            }
        });
        status.map(|_| out)
    }

    /// Dense copy of the values.
    fn to_dense(&self) -> DenseVector<T> {
        match self.as_slice() {
            Some(s) => DenseVector::from(s.to_vec()),
            None => DenseVector::from_fn(self.size(), |i| self.get_quick(i)),
        }
    }

    /// Sets every element to `value`.
    fn assign(&mut self, value: T) -> Result<&mut Self, KError>
    where
        Self: Sized,
    {
        let n = self.size();
        match self.as_mut_slice() {
            Some(s) => s.fill(value),
            None => {
                for i in 0..n {
                    self.set_quick(i, value)?;
                }
            }
        }
        Ok(self)
    }

    /// Copies every element of `other` into `self`.
    fn assign_from<V: Matrix1D<T>>(&mut self, other: &V) -> Result<&mut Self, KError>
    where
        Self: Sized,
    {
        check_same_size(self.size(), other.size())?;
        let n = self.size();
        match (self.as_mut_slice(), other.as_slice()) {
            (Some(dst), Some(src)) => dst.copy_from_slice(src),
            _ => {
                for i in 0..n {
                    self.set_quick(i, other.get_quick(i))?;
                }
            }
        }
        Ok(self)
    }

    /// `self[i] ← f(self[i], other[i])`
    fn assign_with<V, F>(&mut self, other: &V, f: F) -> Result<&mut Self, KError>
    where
        Self: Sized,
        V: Matrix1D<T>,
        F: Fn(T, T) -> T,
    {
        check_same_size(self.size(), other.size())?;
        let n = self.size();
        match (self.as_mut_slice(), other.as_slice()) {
            (Some(dst), Some(src)) => {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = f(*d, s);
                }
            }
            _ => {
                for i in 0..n {
                    let v = f(self.get_quick(i), other.get_quick(i));
                    self.set_quick(i, v)?;
                }
            }
        }
        Ok(self)
    }

    /// `self[i] ← f(self[i])`
    fn assign_fn<F>(&mut self, f: F) -> Result<&mut Self, KError>
    where
        Self: Sized,
        F: Fn(T) -> T,
    {
        let n = self.size();
        match self.as_mut_slice() {
            Some(s) => s.iter_mut().for_each(|v| *v = f(*v)),
            None => {
                for i in 0..n {
                    let v = f(self.get_quick(i));
                    self.set_quick(i, v)?;
                }
            }
        }
        Ok(self)
    }

    /// Element-wise equality (shapes must agree).
    fn equals<V: Matrix1D<T>>(&self, other: &V) -> bool {
        self.size() == other.size() && (0..self.size()).all(|i| self.get_quick(i) == other.get_quick(i))
    }
}

/// Two-dimensional storage.
pub trait Matrix2D<T: Scalar>: MatShape {
    /// Storage type produced by [`like`](Matrix2D::like) and [`copy`](Matrix2D::copy).
    type Like: Matrix2D<T>;
    /// Vector type matching this layout (dense or sparse).
    type Like1D: Matrix1D<T>;

    /// Reads `(i, j)` without checking against the declared shape.
    fn get_quick(&self, i: usize, j: usize) -> T;

    /// Writes `(i, j)` without checking against the declared shape.
    ///
    /// Layouts that cannot represent a value at `(i, j)` (diagonal storage
    /// off its diagonal) fail with [`KError::InvalidInput`].
    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError>;

    /// New zero-filled storage of a compatible layout.
    fn like(&self, rows: usize, cols: usize) -> Self::Like;

    /// New zero-filled vector of a compatible layout.
    fn like_1d(&self, size: usize) -> Self::Like1D;

    fn check_bounds(&self, i: usize, j: usize) -> Result<(), KError> {
        if i >= self.nrows() || j >= self.ncols() {
            return Err(KError::out_of_bounds_2d(i, j, self.nrows(), self.ncols()));
        }
        Ok(())
    }

    fn get(&self, i: usize, j: usize) -> Result<T, KError> {
        self.check_bounds(i, j)?;
        Ok(self.get_quick(i, j))
    }

    fn set(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        self.check_bounds(i, j)?;
        self.set_quick(i, j, value)
    }

    /// Calls `f(i, j, value)` for every non-zero element.
    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                let v = self.get_quick(i, j);
                if v != T::zero() {
                    f(i, j, v);
                }
            }
        }
    }

    /// Number of non-zero elements.
    fn cardinality(&self) -> usize {
        let mut n = 0;
        self.for_each_nonzero(&mut |_, _, _| n += 1);
        n
    }

    /// Deep copy of the (possibly viewed) values into independent storage.
    fn copy(&self) -> Result<Self::Like, KError> {
        let mut out = self.like(self.nrows(), self.ncols());
        let mut status = Ok(());
        self.for_each_nonzero(&mut |i, j, v| {
            if status.is_ok() {
                status = out.set_quick(i, j, v);
            }
        });
        status.map(|_| out)
    }

    /// Row-major dense copy of the values.
    fn to_dense(&self) -> DenseMatrix<T> {
        let mut out = DenseMatrix::new(self.nrows(), self.ncols());
        // Layouts with duplicate entries report each one; add them up.
        self.for_each_nonzero(&mut |i, j, v| {
            let cur = out.get_quick(i, j);
            out.put(i, j, cur + v)
        });
        out
    }

    /// Sets every element to `value`.
    fn assign(&mut self, value: T) -> Result<&mut Self, KError>
    where
        Self: Sized,
    {
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                self.set_quick(i, j, value)?;
            }
        }
        Ok(self)
    }

    /// Copies every element of `other` into `self`.
    fn assign_from<B: Matrix2D<T>>(&mut self, other: &B) -> Result<&mut Self, KError>
    where
        Self: Sized,
    {
        check_same_shape(self, other)?;
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                self.set_quick(i, j, other.get_quick(i, j))?;
            }
        }
        Ok(self)
    }

    /// `self[i, j] ← f(self[i, j], other[i, j])`
    fn assign_with<B, F>(&mut self, other: &B, f: F) -> Result<&mut Self, KError>
    where
        Self: Sized,
        B: Matrix2D<T>,
        F: Fn(T, T) -> T,
    {
        check_same_shape(self, other)?;
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                let v = f(self.get_quick(i, j), other.get_quick(i, j));
                self.set_quick(i, j, v)?;
            }
        }
        Ok(self)
    }

    /// `self[i, j] ← f(self[i, j])`
    fn assign_fn<F>(&mut self, f: F) -> Result<&mut Self, KError>
    where
        Self: Sized,
        F: Fn(T) -> T,
    {
        for i in 0..self.nrows() {
            for j in 0..self.ncols() {
                let v = f(self.get_quick(i, j));
                self.set_quick(i, j, v)?;
            }
        }
        Ok(self)
    }

    /// Element-wise equality (shapes must agree).
    fn equals<B: Matrix2D<T>>(&self, other: &B) -> bool {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return false;
        }
        (0..self.nrows()).all(|i| (0..self.ncols()).all(|j| self.get_quick(i, j) == other.get_quick(i, j)))
    }

    /// `y ← alpha · op(A) · x + beta · y`, `op` being the identity or the transpose.
    ///
    /// The provided implementation walks every element; layouts override it
    /// with loops over their own buffers.
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
        Self: Sized,
        X: Matrix1D<T>,
        Y: Matrix1D<T>,
    {
        let _ = cfg;
        let (m, n) = check_mult_shapes(self, x, y, transpose)?;
        prepare_output(y, beta)?;
        for r in 0..m {
            let mut sum = T::zero();
            for c in 0..n {
                let a = if transpose { self.get_quick(c, r) } else { self.get_quick(r, c) };
                sum = sum + a * x.get_quick(c);
            }
            let cur = y.get_quick(r);
            y.set_quick(r, cur + alpha * sum)?;
        }
        Ok(())
    }
}

/// Matrix–vector product on dense working vectors: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V) -> Result<(), KError>;
    /// Compute y = Aᵗ · x.
    fn mattransvec(&self, x: &V, y: &mut V) -> Result<(), KError>;
}

impl<T: Scalar, M: Matrix2D<T>> MatVec<DenseVector<T>> for M {
    fn matvec(&self, x: &DenseVector<T>, y: &mut DenseVector<T>) -> Result<(), KError> {
        self.z_mult(KernelConfig::global(), x, y, T::one(), T::zero(), false)
    }
    fn mattransvec(&self, x: &DenseVector<T>, y: &mut DenseVector<T>) -> Result<(), KError> {
        self.z_mult(KernelConfig::global(), x, y, T::one(), T::zero(), true)
    }
}

pub(crate) fn check_same_size(a: usize, b: usize) -> Result<(), KError> {
    if a != b {
        return Err(KError::ShapeMismatch(format!("vector sizes differ: {} vs {}", a, b)));
    }
    Ok(())
}

pub(crate) fn check_same_shape<A: MatShape + ?Sized, B: MatShape + ?Sized>(a: &A, b: &B) -> Result<(), KError> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(KError::ShapeMismatch(format!(
            "matrix shapes differ: {}x{} vs {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    Ok(())
}
