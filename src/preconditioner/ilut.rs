//! ILUT preconditioner
//!
//! Incomplete LU with threshold and fill-in control, ILUT(τ, p).
//!
//! # Overview
//!
//! Rows are eliminated one at a time into a sparse work row. An entry is
//! dropped when its magnitude falls below `τ · ‖aᵢ‖₂`, and after elimination
//! at most `p` off-diagonal entries are kept in each of the L and U parts of
//! the row (the largest ones). `L` is unit lower triangular, `U` upper
//! triangular with the pivots on its diagonal; both are stored row-wise.
//!
//! With `τ = 0` and `p ≥ n` nothing is dropped and `LU` is the exact
//! factorization without pivoting.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, Section 10.4.

use crate::core::scalar::Scalar;
use crate::core::traits::{Indexing, Matrix2D};
use crate::error::KError;
use crate::matrix::multi::MultiCompressedMatrix;
use crate::matrix::sparse::Orientation;
use crate::matrix::vector::DenseVector;
use crate::preconditioner::Preconditioner;
use num_traits::Float;
use std::collections::BTreeMap;

/// Default drop tolerance τ.
pub const DEFAULT_DROP_TOL: f64 = 1e-6;
/// Default number of entries p kept per row in each factor.
pub const DEFAULT_FILL: usize = 25;

/// ILUT preconditioner struct.
///
/// - `fill`: entries kept per row in each of L and U, diagonal excluded
/// - `droptol`: relative drop tolerance
/// - `l`: strictly lower part of the unit lower factor
/// - `u`: upper factor including the diagonal
#[derive(Clone, Debug)]
pub struct Ilut<T> {
    pub fill: usize,
    pub droptol: T,
    l: MultiCompressedMatrix<T>,
    u: MultiCompressedMatrix<T>,
    diag: Vec<T>,
}

impl<T: Scalar + Float> Default for Ilut<T> {
    fn default() -> Self {
        Self::new(DEFAULT_FILL, T::from_f64(DEFAULT_DROP_TOL).unwrap_or_else(T::zero))
    }
}

impl<T: Scalar + Float> Ilut<T> {
    /// Create a new ILUT preconditioner with fill and drop tolerance.
    pub fn new(fill: usize, droptol: T) -> Self {
        Self {
            fill,
            droptol,
            l: MultiCompressedMatrix::new(0, 0, Orientation::Row),
            u: MultiCompressedMatrix::new(0, 0, Orientation::Row),
            diag: Vec::new(),
        }
    }

    /// Order of the factored matrix (zero before `setup`).
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    pub fn lower(&self) -> &MultiCompressedMatrix<T> {
        &self.l
    }

    pub fn upper(&self) -> &MultiCompressedMatrix<T> {
        &self.u
    }

    fn factor<M: Matrix2D<T>>(&mut self, a: &M) -> Result<(), KError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(KError::ShapeMismatch(format!("ILUT needs a square matrix, got {}x{}", n, a.ncols())));
        }
        let mut rows: Vec<BTreeMap<usize, T>> = vec![BTreeMap::new(); n];
        a.for_each_nonzero(&mut |i, j, v| {
            let e = rows[i].entry(j).or_insert_with(T::zero);
            *e = *e + v;
        });

        let mut l = MultiCompressedMatrix::new(n, n, Orientation::Row);
        let mut u = MultiCompressedMatrix::new(n, n, Orientation::Row);
        let mut diag = vec![T::zero(); n];
        for (i, mut w) in rows.into_iter().enumerate() {
            let norm = w.values().fold(T::zero(), |acc, v| acc + *v * *v).sqrt();
            let tau = self.droptol * norm;

            // Eliminate with every earlier pivot row that still hits w.
            let mut next = w.range(..i).next().map(|(&k, _)| k);
            while let Some(k) = next {
                let wk = w[&k] / diag[k];
                if wk.abs() < tau {
                    w.remove(&k);
                } else {
                    w.insert(k, wk);
                    for (j, &ukj) in u.line(k).iter() {
                        if j > k {
                            let e = w.entry(j).or_insert_with(T::zero);
                            *e = *e - wk * ukj;
                        }
                    }
                }
                next = w.range(k + 1..i).next().map(|(&k, _)| k);
            }

            let pivot = w.remove(&i).unwrap_or_else(T::zero);
            if pivot == T::zero() || !pivot.is_finite() {
                return Err(KError::ZeroPivot(i));
            }
            diag[i] = pivot;

            let (lower, upper): (Vec<(usize, T)>, Vec<(usize, T)>) =
                w.into_iter().filter(|(_, v)| v.abs() >= tau && *v != T::zero()).partition(|(j, _)| *j < i);
            for (j, v) in self.largest(lower) {
                l.push(i, j, v)?;
            }
            u.push(i, i, pivot)?;
            for (j, v) in self.largest(upper) {
                u.push(i, j, v)?;
            }
        }
        log::debug!(
            "ILUT(τ = {}, p = {}) on {}x{}: nnz(L) = {}, nnz(U) = {}",
            self.droptol,
            self.fill,
            n,
            n,
            l.stored(),
            u.stored()
        );
        self.l = l;
        self.u = u;
        self.diag = diag;
        Ok(())
    }

    /// The `fill` entries of largest magnitude, in increasing column order.
    fn largest(&self, mut entries: Vec<(usize, T)>) -> Vec<(usize, T)> {
        if entries.len() > self.fill {
            entries.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(std::cmp::Ordering::Equal));
            entries.truncate(self.fill);
            entries.sort_by_key(|e| e.0);
        }
        entries
    }

    fn check_len(&self, r: &DenseVector<T>, z: &DenseVector<T>) -> Result<(), KError> {
        let n = self.size();
        if r.size() != n || z.size() != n {
            return Err(KError::ShapeMismatch(format!(
                "ILUT of order {} applied to vectors of size {} and {}",
                n,
                r.size(),
                z.size()
            )));
        }
        Ok(())
    }
}

impl<M, T> Preconditioner<M, DenseVector<T>> for Ilut<T>
where
    M: Matrix2D<T>,
    T: Scalar + Float,
{
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        self.factor(a)
    }

    /// Forward substitution with L, then backward substitution with U.
    fn apply(&self, r: &DenseVector<T>, z: &mut DenseVector<T>) -> Result<(), KError> {
        self.check_len(r, z)?;
        let n = self.size();
        let z = z.as_mut();
        z.copy_from_slice(r.as_ref());
        for i in 0..n {
            let sum = self.l.line(i).iter().fold(z[i], |acc, (j, &lij)| acc - lij * z[j]);
            z[i] = sum;
        }
        for i in (0..n).rev() {
            let sum = self
                .u
                .line(i)
                .iter()
                .filter(|(j, _)| *j > i)
                .fold(z[i], |acc, (j, &uij)| acc - uij * z[j]);
            z[i] = sum / self.diag[i];
        }
        Ok(())
    }

    /// Solves `Uᵗ w = r`, then `Lᵗ z = w`, walking the stored rows as columns.
    fn apply_transpose(&self, r: &DenseVector<T>, z: &mut DenseVector<T>) -> Result<(), KError> {
        self.check_len(r, z)?;
        let n = self.size();
        let z = z.as_mut();
        z.copy_from_slice(r.as_ref());
        for i in 0..n {
            z[i] = z[i] / self.diag[i];
            let zi = z[i];
            for (j, &uij) in self.u.line(i).iter() {
                if j > i {
                    z[j] = z[j] - uij * zi;
                }
            }
        }
        for i in (0..n).rev() {
            let zi = z[i];
            for (j, &lij) in self.l.line(i).iter() {
                z[j] = z[j] - lij * zi;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;
    use crate::matrix::dense::DenseMatrix;
    use crate::matrix::sparse::CompressedMatrix;
    use crate::matrix::triplet::TripletMatrix;
    use approx::assert_abs_diff_eq;

    fn tridiag(n: usize) -> CompressedMatrix<f64> {
        let mut t = TripletMatrix::new(n, n);
        for i in 0..n {
            t.push(i, i, 4.0).unwrap();
            if i > 0 {
                t.push(i, i - 1, -1.0).unwrap();
            }
            if i + 1 < n {
                t.push(i, i + 1, -2.0).unwrap();
            }
        }
        t.to_compressed(Orientation::Row)
    }

    #[test]
    fn ilut_identity() {
        let a = DenseMatrix::<f64>::identity(2);
        let mut pc: Ilut<f64> = Ilut::new(2, 1e-12);
        Preconditioner::<DenseMatrix<f64>, _>::setup(&mut pc, &a).unwrap();
        let r = DenseVector::from(vec![2.0f64, 3.0]);
        let mut z = DenseVector::zeros(2);
        Preconditioner::<DenseMatrix<f64>, _>::apply(&pc, &r, &mut z).unwrap();
        assert_eq!(z, r);
    }

    #[test]
    fn ilut_tridiag_is_exact() {
        let a = tridiag(6);
        let mut pc: Ilut<f64> = Ilut::new(6, 0.0);
        Preconditioner::<CompressedMatrix<f64>, _>::setup(&mut pc, &a).unwrap();
        let x = DenseVector::from_fn(6, |i| (i as f64) - 2.5);

        let mut ax = DenseVector::zeros(6);
        a.matvec(&x, &mut ax).unwrap();
        let mut z = DenseVector::zeros(6);
        Preconditioner::<CompressedMatrix<f64>, _>::apply(&pc, &ax, &mut z).unwrap();
        for i in 0..6 {
            assert_abs_diff_eq!(z[i], x[i], epsilon = 1e-12);
        }

        let mut atx = DenseVector::zeros(6);
        a.mattransvec(&x, &mut atx).unwrap();
        Preconditioner::<CompressedMatrix<f64>, _>::apply_transpose(&pc, &atx, &mut z).unwrap();
        for i in 0..6 {
            assert_abs_diff_eq!(z[i], x[i], epsilon = 1e-12);
        }
        // Tridiagonal elimination creates no fill.
        assert_eq!(pc.lower().stored(), 5);
        assert_eq!(pc.upper().stored(), 11);
    }

    #[test]
    fn dense_without_dropping_is_exact_lu() {
        let a = DenseMatrix::from_rows(&[
            vec![5.0, 1.0, 2.0, 0.5],
            vec![1.0, 6.0, -1.0, 1.0],
            vec![2.0, -1.0, 7.0, 1.5],
            vec![0.5, 1.0, 1.5, 4.0],
        ])
        .unwrap();
        let mut pc: Ilut<f64> = Ilut::new(4, 0.0);
        Preconditioner::<DenseMatrix<f64>, _>::setup(&mut pc, &a).unwrap();
        let x = DenseVector::from(vec![1.0, -1.0, 2.0, 0.5]);
        let mut ax = DenseVector::zeros(4);
        a.matvec(&x, &mut ax).unwrap();
        let mut z = DenseVector::zeros(4);
        Preconditioner::<DenseMatrix<f64>, _>::apply(&pc, &ax, &mut z).unwrap();
        for i in 0..4 {
            assert_abs_diff_eq!(z[i], x[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn fill_limit_keeps_largest_entries() {
        let a = DenseMatrix::from_rows(&[vec![4.0, 0.1, 3.0], vec![0.0, 5.0, 0.0], vec![0.0, 0.0, 6.0]]).unwrap();
        let mut pc: Ilut<f64> = Ilut::new(1, 0.0);
        Preconditioner::<DenseMatrix<f64>, _>::setup(&mut pc, &a).unwrap();
        assert_eq!(pc.upper().line(0).idx, vec![0, 2]);
    }

    #[test]
    fn zero_pivot_and_shape_errors() {
        let a = DenseMatrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let mut pc: Ilut<f64> = Ilut::default();
        assert!(matches!(
            Preconditioner::<DenseMatrix<f64>, DenseVector<f64>>::setup(&mut pc, &a),
            Err(KError::ZeroPivot(0))
        ));
        let rect = DenseMatrix::<f64>::new(2, 3);
        assert!(matches!(
            Preconditioner::<DenseMatrix<f64>, DenseVector<f64>>::setup(&mut pc, &rect),
            Err(KError::ShapeMismatch(_))
        ));
    }
}
