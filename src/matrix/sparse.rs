// Compressed sparse storage (RC and CC)

use crate::core::kernel::{check_mult_shapes, prepare_output};
use crate::core::scalar::Scalar;
use crate::core::traits::{MatShape, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::vector::SparseVector;
use crate::parallel::KernelConfig;

/// Which dimension the compressed lines run along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Compressed rows (CSR): one line per row, indices are columns.
    Row,
    /// Compressed columns (CSC): one line per column, indices are rows.
    Column,
}

/// Compressed sparse matrix with a single value per coordinate.
///
/// Line `l` occupies `idx[ptr[l]..ptr[l + 1]]` / `vals[..]`. The structure is
/// kept canonical at all times: indices strictly increase within a line and
/// no explicit zero is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedMatrix<T> {
    rows: usize,
    cols: usize,
    orientation: Orientation,
    ptr: Vec<usize>,
    idx: Vec<usize>,
    vals: Vec<T>,
}

impl<T: Scalar> CompressedMatrix<T> {
    pub fn new(rows: usize, cols: usize, orientation: Orientation) -> Self {
        Self::with_capacity(rows, cols, orientation, 0)
    }

    /// Empty matrix with room for `nnz` entries before reallocating.
    pub fn with_capacity(rows: usize, cols: usize, orientation: Orientation, nnz: usize) -> Self {
        let lines = match orientation {
            Orientation::Row => rows,
            Orientation::Column => cols,
        };
        Self {
            rows,
            cols,
            orientation,
            ptr: vec![0; lines + 1],
            idx: Vec::with_capacity(nnz),
            vals: Vec::with_capacity(nnz),
        }
    }

    /// Build from raw pointer, index and value arrays.
    ///
    /// The arrays must already be canonical; explicit zeros are dropped.
    pub fn from_raw(
        rows: usize,
        cols: usize,
        orientation: Orientation,
        ptr: Vec<usize>,
        idx: Vec<usize>,
        vals: Vec<T>,
    ) -> Result<Self, KError> {
        let (lines, extent) = match orientation {
            Orientation::Row => (rows, cols),
            Orientation::Column => (cols, rows),
        };
        if ptr.len() != lines + 1 || ptr[0] != 0 || ptr[lines] != idx.len() || idx.len() != vals.len() {
            return Err(KError::InvalidInput("inconsistent compressed arrays".into()));
        }
        for l in 0..lines {
            if ptr[l] > ptr[l + 1] || ptr[l + 1] > idx.len() {
                return Err(KError::InvalidInput(format!("pointer out of order at line {}", l)));
            }
            let line = &idx[ptr[l]..ptr[l + 1]];
            if line.windows(2).any(|w| w[0] >= w[1]) {
                return Err(KError::InvalidInput(format!("indices of line {} not strictly increasing", l)));
            }
            if line.last().is_some_and(|&i| i >= extent) {
                return Err(KError::InvalidInput(format!("index out of range in line {}", l)));
            }
        }
        let mut m = Self { rows, cols, orientation, ptr, idx, vals };
        m.drop_zeros();
        Ok(m)
    }

    /// Wraps arrays the caller already produced in canonical form.
    pub(crate) fn from_canonical(
        rows: usize,
        cols: usize,
        orientation: Orientation,
        ptr: Vec<usize>,
        idx: Vec<usize>,
        vals: Vec<T>,
    ) -> Self {
        debug_assert_eq!(ptr.last().copied(), Some(idx.len()));
        Self { rows, cols, orientation, ptr, idx, vals }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    pub fn ptr(&self) -> &[usize] {
        &self.ptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.idx
    }

    pub fn values(&self) -> &[T] {
        &self.vals
    }

    /// Indices and values of line `l`.
    pub fn line(&self, l: usize) -> (&[usize], &[T]) {
        let r = self.ptr[l]..self.ptr[l + 1];
        (&self.idx[r.clone()], &self.vals[r])
    }

    #[inline]
    fn line_and_index(&self, i: usize, j: usize) -> (usize, usize) {
        match self.orientation {
            Orientation::Row => (i, j),
            Orientation::Column => (j, i),
        }
    }

    /// Position of `(line, index)` in the arrays, or where it would be inserted.
    #[inline]
    fn search(&self, line: usize, index: usize) -> Result<usize, usize> {
        let lo = self.ptr[line];
        self.idx[lo..self.ptr[line + 1]]
            .binary_search(&index)
            .map(|p| p + lo)
            .map_err(|p| p + lo)
    }

    fn drop_zeros(&mut self) {
        if self.vals.iter().all(|v| *v != T::zero()) {
            return;
        }
        let mut w = 0;
        let mut start = 0;
        for l in 0..self.ptr.len() - 1 {
            let end = self.ptr[l + 1];
            for k in start..end {
                if self.vals[k] != T::zero() {
                    self.idx[w] = self.idx[k];
                    self.vals[w] = self.vals[k];
                    w += 1;
                }
            }
            start = end;
            self.ptr[l + 1] = w;
        }
        self.idx.truncate(w);
        self.vals.truncate(w);
    }

    /// Row-oriented gather: `dot(line l, x)`.
    #[inline]
    fn line_dot(&self, l: usize, x: &[T]) -> T {
        let (idx, vals) = self.line(l);
        idx.iter().zip(vals).fold(T::zero(), |acc, (&c, &v)| acc + v * x[c])
    }
}

impl<T> MatShape for CompressedMatrix<T> {
    fn nrows(&self) -> usize {
        self.rows
    }
    fn ncols(&self) -> usize {
        self.cols
    }
}

impl<T: Scalar> Matrix2D<T> for CompressedMatrix<T> {
    type Like = CompressedMatrix<T>;
    type Like1D = SparseVector<T>;

    fn get_quick(&self, i: usize, j: usize) -> T {
        let (l, k) = self.line_and_index(i, j);
        match self.search(l, k) {
            Ok(p) => self.vals[p],
            Err(_) => T::zero(),
        }
    }

    fn set_quick(&mut self, i: usize, j: usize, value: T) -> Result<(), KError> {
        let (l, k) = self.line_and_index(i, j);
        match (self.search(l, k), value == T::zero()) {
            (Ok(p), false) => self.vals[p] = value,
            (Ok(p), true) => {
                self.idx.remove(p);
                self.vals.remove(p);
                self.ptr[l + 1..].iter_mut().for_each(|q| *q -= 1);
            }
            (Err(p), false) => {
                self.idx.insert(p, k);
                self.vals.insert(p, value);
                self.ptr[l + 1..].iter_mut().for_each(|q| *q += 1);
            }
            (Err(_), true) => {}
        }
        Ok(())
    }

    fn like(&self, rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, self.orientation)
    }

    fn like_1d(&self, size: usize) -> SparseVector<T> {
        SparseVector::new(size)
    }

    fn for_each_nonzero(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for l in 0..self.ptr.len() - 1 {
            let (idx, vals) = self.line(l);
            for (&k, &v) in idx.iter().zip(vals) {
                match self.orientation {
                    Orientation::Row => f(l, k, v),
                    Orientation::Column => f(k, l, v),
                }
            }
        }
    }

    fn cardinality(&self) -> usize {
        self.nnz()
    }

    fn copy(&self) -> Result<Self, KError> {
        Ok(self.clone())
    }

    fn assign(&mut self, value: T) -> Result<&mut Self, KError> {
        if value == T::zero() {
            self.ptr.fill(0);
            self.idx.clear();
            self.vals.clear();
            return Ok(self);
        }
        let (lines, extent) = match self.orientation {
            Orientation::Row => (self.rows, self.cols),
            Orientation::Column => (self.cols, self.rows),
        };
        self.idx = (0..lines).flat_map(|_| 0..extent).collect();
        self.vals = vec![value; lines * extent];
        self.ptr = (0..=lines).map(|l| l * extent).collect();
        Ok(self)
    }

    fn assign_fn<F: Fn(T) -> T>(&mut self, f: F) -> Result<&mut Self, KError> {
        if f(T::zero()) != T::zero() {
            // Implicit zeros change too: fall back to the element-wise path.
            for i in 0..self.rows {
                for j in 0..self.cols {
                    let v = f(self.get_quick(i, j));
                    self.set_quick(i, j, v)?;
                }
            }
            return Ok(self);
        }
        self.vals.iter_mut().for_each(|v| *v = f(*v));
        self.drop_zeros();
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
        let mut acc = vec![T::zero(); m];
        let gather = (self.orientation == Orientation::Row) != transpose;
        if gather {
            // Each line is one output element.
            #[cfg(feature = "rayon")]
            {
                use rayon::prelude::*;
                match cfg.pool_for(self.nnz()) {
                    Some(pool) => pool.install(|| {
                        acc.par_iter_mut().enumerate().for_each(|(l, s)| *s = self.line_dot(l, &xs));
                    }),
                    None => acc.iter_mut().enumerate().for_each(|(l, s)| *s = self.line_dot(l, &xs)),
                }
            }
            #[cfg(not(feature = "rayon"))]
            {
                let _ = cfg;
                acc.iter_mut().enumerate().for_each(|(l, s)| *s = self.line_dot(l, &xs));
            }
        } else {
            // Each line scatters into the output.
            for (l, &xl) in xs.iter().enumerate() {
                if xl == T::zero() {
                    continue;
                }
                let (idx, vals) = self.line(l);
                for (&k, &v) in idx.iter().zip(vals) {
                    acc[k] = acc[k] + v * xl;
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::multiply;
    use crate::matrix::dense::DenseMatrix;
    use crate::matrix::vector::DenseVector;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CompressedMatrix::from_raw(3, 3, Orientation::Row, vec![0, 1, 2, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0])
            .unwrap();
        let x = DenseVector::from(vec![2.0, 3.0, 5.0]);
        let mut y = DenseVector::zeros(3);
        multiply(&m, &x, &mut y, 1.0, 0.0, false).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn simple_pattern_both_orientations() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let rc = CompressedMatrix::from_raw(2, 3, Orientation::Row, vec![0, 2, 4], vec![0, 1, 1, 2], vec![1, 2, 3, 4])
            .unwrap();
        let cc = CompressedMatrix::from_raw(2, 3, Orientation::Column, vec![0, 1, 3, 4], vec![0, 0, 1, 1], vec![1, 2, 3, 4])
            .unwrap();
        assert!(rc.equals(&cc));
        for m in [&rc, &cc] {
            let x = DenseVector::from(vec![1, 1, 1]);
            let mut y = DenseVector::zeros(2);
            multiply(m, &x, &mut y, 1, 0, false).unwrap();
            assert_eq!(y.as_ref(), &[3, 7]);
            let u = DenseVector::from(vec![1, 2]);
            let mut z = DenseVector::zeros(3);
            multiply(m, &u, &mut z, 1, 0, true).unwrap();
            assert_eq!(z.as_ref(), &[1, 8, 8]);
        }
    }

    #[test]
    fn writes_stay_canonical() {
        let mut m = CompressedMatrix::<f64>::new(3, 3, Orientation::Row);
        m.set(1, 2, 4.0).unwrap();
        m.set(1, 0, 2.0).unwrap();
        m.set(0, 1, 1.0).unwrap();
        assert_eq!(m.ptr(), &[0, 1, 3, 3]);
        assert_eq!(m.indices(), &[1, 0, 2]);
        m.set(1, 0, 0.0).unwrap();
        assert_eq!(m.ptr(), &[0, 1, 2, 2]);
        assert_eq!(m.values(), &[1.0, 4.0]);
        assert_eq!(m.cardinality(), 2);
    }

    #[test]
    fn rejects_unsorted_lines() {
        let r = CompressedMatrix::from_raw(1, 3, Orientation::Row, vec![0, 2], vec![2, 0], vec![1.0, 1.0]);
        assert!(matches!(r, Err(KError::InvalidInput(_))));
    }

    #[test]
    fn rejects_interior_pointer_past_indices() {
        let r = CompressedMatrix::<f64>::from_raw(2, 3, Orientation::Row, vec![0, 3, 2], vec![0, 1], vec![1.0, 1.0]);
        assert!(matches!(r, Err(KError::InvalidInput(_))));
    }

    #[test]
    fn assign_fn_with_nonzero_image_of_zero() {
        let mut m = CompressedMatrix::<i64>::new(2, 2, Orientation::Column);
        m.set(0, 0, 3).unwrap();
        m.assign_fn(|v| v + 1).unwrap();
        let d = DenseMatrix::from_rows(&[vec![4, 1], vec![1, 1]]).unwrap();
        assert!(m.equals(&d));
        m.assign_fn(|v| v - 1).unwrap();
        assert_eq!(m.nnz(), 1);
    }
}
