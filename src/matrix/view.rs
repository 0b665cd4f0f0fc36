//! Zero-copy views over shared storage.
//!
//! Storage that can be viewed lives in a [`Shared`] handle (`Arc<RwLock<S>>`).
//! A view holds only a `Weak` reference plus an affine index map, so views
//! never keep storage alive and always observe the current values. Reading
//! a physical element for logical `(i, j)` goes through
//!
//! ```text
//! row = r0 + i·a + j·b
//! col = c0 + i·c + j·d
//! ```
//!
//! Transposing, taking a sub-block or striding only rewrites these six
//! numbers, so any chain of views costs the same as a single one.
//!
//! A view must not be used as the output of an operation whose input is a
//! view of the same storage while that storage is locked for reading; the
//! kernels below release their read lock before writing the output.

use crate::core::kernel::{check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{Indexing, MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::diagonal::diagonal_length;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

fn read_lock<S>(lock: &RwLock<S>) -> RwLockReadGuard<'_, S> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<S>(lock: &RwLock<S>) -> RwLockWriteGuard<'_, S> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn upgrade<S>(storage: &Weak<RwLock<S>>) -> Result<Arc<RwLock<S>>, KError> {
    storage.upgrade().ok_or(KError::DetachedView)
}

/// Upgrade for the infallible accessors.
///
/// # Panics
/// If the storage has been dropped.
fn upgrade_or_panic<S>(storage: &Weak<RwLock<S>>) -> Arc<RwLock<S>> {
    match storage.upgrade() {
        Some(s) => s,
        None => panic!("{}", KError::DetachedView),
    }
}

/// Owning, shareable handle to a storage instance.
pub struct Shared<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for Shared<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> Shared<S> {
    pub fn new(storage: S) -> Self {
        Self { inner: Arc::new(RwLock::new(storage)) }
    }

    /// Read access to the storage.
    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        read_lock(&self.inner)
    }

    /// Write access to the storage.
    pub fn write(&self) -> RwLockWriteGuard<'_, S> {
        write_lock(&self.inner)
    }

    /// Unwraps the storage if this is the last owning handle.
    pub fn try_unwrap(self) -> Result<S, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }

    fn downgrade(&self) -> Weak<RwLock<S>> {
        Arc::downgrade(&self.inner)
    }
}

impl<S: MatShape> Shared<S> {
    /// View of the whole matrix.
    pub fn view(&self) -> MatrixView<S> {
        let s = self.read();
        MatrixView {
            storage: self.downgrade(),
            map: Affine::identity(s.nrows(), s.ncols()),
        }
    }

    pub fn view_transpose(&self) -> MatrixView<S> {
        self.view().view_transpose()
    }

    pub fn view_part(&self, row: usize, col: usize, height: usize, width: usize) -> Result<MatrixView<S>, KError> {
        self.view().view_part(row, col, height, width)
    }

    pub fn view_strides(&self, row_stride: usize, col_stride: usize) -> Result<MatrixView<S>, KError> {
        self.view().view_strides(row_stride, col_stride)
    }

    pub fn view_row(&self, i: usize) -> Result<LineView<S>, KError> {
        self.view().view_row(i)
    }

    pub fn view_column(&self, j: usize) -> Result<LineView<S>, KError> {
        self.view().view_column(j)
    }

    pub fn view_diagonal(&self, k: isize) -> LineView<S> {
        self.view().view_diagonal(k)
    }
}

impl<S: Indexing> Shared<S> {
    /// View of the whole vector.
    pub fn view_vector(&self) -> VectorView<S> {
        let len = self.read().size();
        VectorView { storage: self.downgrade(), offset: 0, stride: 1, len }
    }

    pub fn view_segment(&self, offset: usize, len: usize) -> Result<VectorView<S>, KError> {
        self.view_vector().view_segment(offset, len)
    }

    pub fn view_stride(&self, stride: usize) -> Result<VectorView<S>, KError> {
        self.view_vector().view_stride(stride)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Affine {
    r0: usize,
    c0: usize,
    a: usize,
    b: usize,
    c: usize,
    d: usize,
    rows: usize,
    cols: usize,
}

impl Affine {
    fn identity(rows: usize, cols: usize) -> Self {
        Self { r0: 0, c0: 0, a: 1, b: 0, c: 0, d: 1, rows, cols }
    }

    #[inline]
    fn phys(&self, i: usize, j: usize) -> (usize, usize) {
        (self.r0 + i * self.a + j * self.b, self.c0 + i * self.c + j * self.d)
    }

    fn transpose(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
            c: self.d,
            d: self.c,
            rows: self.cols,
            cols: self.rows,
            ..*self
        }
    }

    /// `Some(transposed)` when the map covers a `rows × cols` storage exactly,
    /// possibly transposed.
    fn whole(&self, rows: usize, cols: usize) -> Option<bool> {
        if self.r0 != 0 || self.c0 != 0 {
            return None;
        }
        match (self.a, self.b, self.c, self.d) {
            (1, 0, 0, 1) if (self.rows, self.cols) == (rows, cols) => Some(false),
            (0, 1, 1, 0) if (self.rows, self.cols) == (cols, rows) => Some(true),
            _ => None,
        }
    }
}

/// Two-dimensional view: a weak storage reference and an index map.
pub struct MatrixView<S> {
    storage: Weak<RwLock<S>>,
    map: Affine,
}

impl<S> Clone for MatrixView<S> {
    fn clone(&self) -> Self {
        Self { storage: Weak::clone(&self.storage), map: self.map }
    }
}

/// Views are equal when they alias the same storage through the same map.
impl<S> PartialEq for MatrixView<S> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.storage, &other.storage) && self.map == other.map
    }
}

impl<S> std::fmt::Debug for MatrixView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixView")
            .field("map", &self.map)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<S> MatrixView<S> {
    /// Whether the backing storage is still alive.
    pub fn is_attached(&self) -> bool {
        self.storage.strong_count() > 0
    }

    pub fn view_transpose(&self) -> Self {
        Self { storage: Weak::clone(&self.storage), map: self.map.transpose() }
    }

    /// `height × width` block whose top-left corner is `(row, col)`.
    pub fn view_part(&self, row: usize, col: usize, height: usize, width: usize) -> Result<Self, KError> {
        let m = &self.map;
        if row + height > m.rows || col + width > m.cols {
            return Err(KError::out_of_bounds_2d(row + height, col + width, m.rows, m.cols));
        }
        let (r0, c0) = m.phys(row, col);
        let map = Affine { r0, c0, rows: height, cols: width, ..*m };
        Ok(Self { storage: Weak::clone(&self.storage), map })
    }

    /// Every `row_stride`-th row and `col_stride`-th column, starting at `(0, 0)`.
    pub fn view_strides(&self, row_stride: usize, col_stride: usize) -> Result<Self, KError> {
        if row_stride == 0 || col_stride == 0 {
            return Err(KError::InvalidInput("strides must be positive".into()));
        }
        let m = &self.map;
        let map = Affine {
            a: m.a * row_stride,
            c: m.c * row_stride,
            b: m.b * col_stride,
            d: m.d * col_stride,
            rows: m.rows.div_ceil(row_stride),
            cols: m.cols.div_ceil(col_stride),
            ..*m
        };
        Ok(Self { storage: Weak::clone(&self.storage), map })
    }

    pub fn view_row(&self, i: usize) -> Result<LineView<S>, KError> {
        if i >= self.map.rows {
            return Err(KError::out_of_bounds_2d(i, 0, self.map.rows, self.map.cols));
        }
        Ok(self.line(i, 0, (0, 1), self.map.cols))
    }

    pub fn view_column(&self, j: usize) -> Result<LineView<S>, KError> {
        if j >= self.map.cols {
            return Err(KError::out_of_bounds_2d(0, j, self.map.rows, self.map.cols));
        }
        Ok(self.line(0, j, (1, 0), self.map.rows))
    }

    /// Diagonal `k` (`k > 0` above the main one); empty when out of range.
    pub fn view_diagonal(&self, k: isize) -> LineView<S> {
        let len = diagonal_length(self.map.rows, self.map.cols, k);
        let (i, j) = if k >= 0 { (0, k as usize) } else { (k.unsigned_abs(), 0) };
        if len == 0 {
            return self.line(0, 0, (1, 1), 0);
        }
        self.line(i, j, (1, 1), len)
    }

    /// Line starting at logical `(i, j)` advancing by logical `(di, dj)`.
    fn line(&self, i: usize, j: usize, (di, dj): (usize, usize), len: usize) -> LineView<S> {
        let m = &self.map;
        LineView {
            storage: Weak::clone(&self.storage),
            start: m.phys(i, j),
            step: (di * m.a + dj * m.b, di * m.c + dj * m.d),
            len,
        }
    }
}

impl<S> MatShape for MatrixView<S> {
    fn nrows(&self) -> usize {
        self.map.rows
    }
    fn ncols(&self) -> usize {
        self.map.cols
    }
}

impl<T: Scalar, S: Matrix2D<T>> Matrix2D<T> for MatrixView<S> {
    type Like = S::Like;
    type Like1D = S::Like1D;

    fn get_quick(&self, i: usize, j: usize) -> T {
        let (r, c) = self.map.phys(i, j);
        read_lock(&upgrade_or_panic(&self.storage)).get_quick(r, c)
    }

    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        let (r, c) = self.map.phys(i, j);
        let arc = upgrade(&self.storage)?;
        write_lock(&arc).set_quick(r, c, value)
    }

    fn like(&self, rows: usize, cols: usize) -> S::Like {
        read_lock(&upgrade_or_panic(&self.storage)).like(rows, cols)
    }

    fn like_1d(&self, size: usize) -> S::Like1D {
        read_lock(&upgrade_or_panic(&self.storage)).like_1d(size)
    }

    fn get(&self, i: usize, j: usize) -> Result<T, KError> {
        self.check_bounds(i, j)?;
        let (r, c) = self.map.phys(i, j);
        let arc = upgrade(&self.storage)?;
        Ok(read_lock(&arc).get_quick(r, c))
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        let arc = upgrade_or_panic(&self.storage);
        let s = read_lock(&arc);
        match self.map.whole(s.nrows(), s.ncols()) {
            Some(false) => s.for_each_nonzero(f),
            Some(true) => s.for_each_nonzero(&mut |i, j, v| f(j, i, v)),
            None => {
                for i in 0..self.map.rows {
                    for j in 0..self.map.cols {
                        let (r, c) = self.map.phys(i, j);
                        let v = s.get_quick(r, c);
                        if v != T::zero() {
                            f(i, j, v);
                        }
                    }
                }
            }
        }
    }

    fn cardinality(&self) -> usize {
        let arc = upgrade_or_panic(&self.storage);
        let s = read_lock(&arc);
        if self.map.whole(s.nrows(), s.ncols()).is_some() {
            return s.cardinality();
        }
        let mut n = 0;
        for i in 0..self.map.rows {
            for j in 0..self.map.cols {
                let (r, c) = self.map.phys(i, j);
                if s.get_quick(r, c) != T::zero() {
                    n += 1;
                }
            }
        }
        n
    }

    fn copy(&self) -> Result<S::Like, KError> {
        let arc = upgrade(&self.storage)?;
        let s = read_lock(&arc);
        let mut out = s.like(self.map.rows, self.map.cols);
        for i in 0..self.map.rows {
            for j in 0..self.map.cols {
                let (r, c) = self.map.phys(i, j);
                let v = s.get_quick(r, c);
                if v != T::zero() {
                    out.set_quick(i, j, v)?;
                }
            }
        }
        Ok(out)
    }

    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        let arc = upgrade(&self.storage)?;
        {
            let mut s = write_lock(&arc);
            for i in 0..self.map.rows {
                for j in 0..self.map.cols {
                    let (r, c) = self.map.phys(i, j);
                    s.set_quick(r, c, value)?;
                }
            }
        }
        Ok(self)
    }

    fn assign_fn<F: Fn(T) -> T>(&mut self, f: F) -> Result<&mut Self, KError> {
        let arc = upgrade(&self.storage)?;
        {
            let mut s = write_lock(&arc);
            for i in 0..self.map.rows {
                for j in 0..self.map.cols {
                    let (r, c) = self.map.phys(i, j);
                    let v = f(s.get_quick(r, c));
                    s.set_quick(r, c, v)?;
                }
            }
        }
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
        let arc = upgrade(&self.storage)?;
        // Gather x before locking so x may itself view this storage.
        let xs = DenseVector::from_fn(n, |c| x.get_quick(c));
        let mut acc = DenseVector::zeros(m);
        {
            let s = read_lock(&arc);
            match self.map.whole(s.nrows(), s.ncols()) {
                Some(swapped) => s.z_mult(cfg, &xs, &mut acc, T::one(), T::zero(), transpose != swapped)?,
                None => {
                    for r in 0..m {
                        let mut sum = T::zero();
                        for c in 0..n {
                            let (i, j) = if transpose { (c, r) } else { (r, c) };
                            let (pi, pj) = self.map.phys(i, j);
                            sum = sum + s.get_quick(pi, pj) * xs[c];
                        }
                        acc[r] = sum;
                    }
                }
            }
        }
        prepare_output(y, beta)?;
        for (r, &v) in acc.iter().enumerate() {
            let cur = y.get_quick(r);
            y.set_quick(r, cur + alpha * v)?;
        }
        Ok(())
    }
}

/// One-dimensional view of a row, column or diagonal of matrix storage.
pub struct LineView<S> {
    storage: Weak<RwLock<S>>,
    start: (usize, usize),
    step: (usize, usize),
    len: usize,
}

impl<S> Clone for LineView<S> {
    fn clone(&self) -> Self {
        Self { storage: Weak::clone(&self.storage), ..*self }
    }
}

impl<S> LineView<S> {
    pub fn is_attached(&self) -> bool {
        self.storage.strong_count() > 0
    }

    #[inline]
    fn phys(&self, t: usize) -> (usize, usize) {
        (self.start.0 + t * self.step.0, self.start.1 + t * self.step.1)
    }

    pub fn view_segment(&self, offset: usize, len: usize) -> Result<Self, KError> {
        if offset + len > self.len {
            return Err(KError::out_of_bounds_1d(offset + len, self.len));
        }
        Ok(Self { storage: Weak::clone(&self.storage), start: self.phys(offset), len, ..*self })
    }

    pub fn view_stride(&self, stride: usize) -> Result<Self, KError> {
        if stride == 0 {
            return Err(KError::InvalidInput("stride must be positive".into()));
        }
        Ok(Self {
            storage: Weak::clone(&self.storage),
            step: (self.step.0 * stride, self.step.1 * stride),
            len: self.len.div_ceil(stride),
            ..*self
        })
    }
}

impl<S> Indexing for LineView<S> {
    fn size(&self) -> usize {
        self.len
    }
}

impl<T: Scalar, S: Matrix2D<T>> Matrix1D<T> for LineView<S> {
    type Like = S::Like1D;

    fn get_quick(&self, i: usize) -> T {
        let (r, c) = self.phys(i);
        read_lock(&upgrade_or_panic(&self.storage)).get_quick(r, c)
    }

    fn set_quick(&mut self, i: usize, value: T) -> Result<(), KError> {
        let (r, c) = self.phys(i);
        let arc = upgrade(&self.storage)?;
        write_lock(&arc).set_quick(r, c, value)
    }

    fn like(&self, size: usize) -> S::Like1D {
        read_lock(&upgrade_or_panic(&self.storage)).like_1d(size)
    }

    fn get(&self, i: usize) -> Result<T, KError> {
        if i >= self.len {
            return Err(KError::out_of_bounds_1d(i, self.len));
        }
        let (r, c) = self.phys(i);
        let arc = upgrade(&self.storage)?;
        Ok(read_lock(&arc).get_quick(r, c))
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, T)) {
        let arc = upgrade_or_panic(&self.storage);
        let s = read_lock(&arc);
        for t in 0..self.len {
            let (r, c) = self.phys(t);
            let v = s.get_quick(r, c);
            if v != T::zero() {
                f(t, v);
            }
        }
    }

    fn copy(&self) -> Result<S::Like1D, KError> {
        let arc = upgrade(&self.storage)?;
        let s = read_lock(&arc);
        let mut out = s.like_1d(self.len);
        for t in 0..self.len {
            let (r, c) = self.phys(t);
            let v = s.get_quick(r, c);
            if v != T::zero() {
                out.set_quick(t, v)?;
            }
        }
        Ok(out)
    }
}

/// One-dimensional view into vector storage: `len` elements from `offset`
/// every `stride` positions.
pub struct VectorView<S> {
    storage: Weak<RwLock<S>>,
    offset: usize,
    stride: usize,
    len: usize,
}

impl<S> Clone for VectorView<S> {
    fn clone(&self) -> Self {
        Self { storage: Weak::clone(&self.storage), ..*self }
    }
}

impl<S> VectorView<S> {
    pub fn is_attached(&self) -> bool {
        self.storage.strong_count() > 0
    }

    #[inline]
    fn phys(&self, t: usize) -> usize {
        self.offset + t * self.stride
    }

    pub fn view_segment(&self, offset: usize, len: usize) -> Result<Self, KError> {
        if offset + len > self.len {
            return Err(KError::out_of_bounds_1d(offset + len, self.len));
        }
        Ok(Self { storage: Weak::clone(&self.storage), offset: self.phys(offset), len, ..*self })
    }

    pub fn view_stride(&self, stride: usize) -> Result<Self, KError> {
        if stride == 0 {
            return Err(KError::InvalidInput("stride must be positive".into()));
        }
        Ok(Self {
            storage: Weak::clone(&self.storage),
            stride: self.stride * stride,
            len: self.len.div_ceil(stride),
            ..*self
        })
    }
}

impl<S> Indexing for VectorView<S> {
    fn size(&self) -> usize {
        self.len
    }
}

impl<T: Scalar, S: Matrix1D<T>> Matrix1D<T> for VectorView<S> {
    type Like = S::Like;

    fn get_quick(&self, i: usize) -> T {
        read_lock(&upgrade_or_panic(&self.storage)).get_quick(self.phys(i))
    }

    fn set_quick(&mut self, i: usize, value: T) -> Result<(), KError> {
        let arc = upgrade(&self.storage)?;
        write_lock(&arc).set_quick(self.phys(i), value)
    }

    fn like(&self, size: usize) -> S::Like {
        read_lock(&upgrade_or_panic(&self.storage)).like(size)
    }

    fn get(&self, i: usize) -> Result<T, KError> {
        if i >= self.len {
            return Err(KError::out_of_bounds_1d(i, self.len));
        }
        let arc = upgrade(&self.storage)?;
        Ok(read_lock(&arc).get_quick(self.phys(i)))
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, T)) {
        let arc = upgrade_or_panic(&self.storage);
        let s = read_lock(&arc);
        for t in 0..self.len {
            let v = s.get_quick(self.phys(t));
            if v != T::zero() {
                f(t, v);
            }
        }
    }

    fn copy(&self) -> Result<S::Like, KError> {
        let arc = upgrade(&self.storage)?;
        let s = read_lock(&arc);
        let mut out = s.like(self.len);
        for t in 0..self.len {
            let v = s.get_quick(self.phys(t));
            if v != T::zero() {
                out.set_quick(t, v)?;
            }
        }
        Ok(out)
    }
}
