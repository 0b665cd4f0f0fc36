//! Algebra kernel: norms, inner products and matrix–vector products.
//!
//! The free functions run against the process-wide [`KernelConfig::global`];
//! the [`InnerProduct`] methods take an explicit configuration. All of them
//! work on any [`Matrix1D`]/[`Matrix2D`] implementation. Contiguous operands
//! take a slice fast path that is split across the configured Rayon pool
//! once they exceed `KernelConfig::min_parallel_len`.
//!
//! # References
//! - Anderson, E. (2017). Algorithm 978: Safe Scaling in the Level 1 BLAS. ACM TOMS 44(1).

use crate::core::scalar::Scalar;
use crate::core::traits::{Indexing, MatShape, Matrix1D, Matrix2D, check_same_size};
use crate::error::KError;
use crate::parallel::KernelConfig;
use num_traits::{Float, One, Zero};

/// Inner products & norms.
pub trait InnerProduct<T: Scalar> {
    /// Compute dot(u, v).
    fn dot<U: Matrix1D<T>, V: Matrix1D<T>>(&self, u: &U, v: &V) -> Result<T, KError>;
    /// Compute ‖v‖₂ without intermediate overflow or underflow.
    fn norm2<V: Matrix1D<T>>(&self, v: &V) -> T::Real;
}

impl<T: Scalar> InnerProduct<T> for KernelConfig {
    fn dot<U: Matrix1D<T>, V: Matrix1D<T>>(&self, u: &U, v: &V) -> Result<T, KError> {
        check_same_size(u.size(), v.size())?;
        if let (Some(a), Some(b)) = (u.as_slice(), v.as_slice()) {
            #[cfg(feature = "rayon")]
            {
                if let Some(pool) = self.pool_for(a.len()) {
                    use rayon::prelude::*;
                    return Ok(pool.install(|| {
                        a.par_iter()
                            .zip(b.par_iter())
                            .map(|(x, y)| *x * *y)
                            .reduce(T::zero, |p, q| p + q)
                    }));
                }
            }
            return Ok(a.iter().zip(b).fold(T::zero(), |acc, (x, y)| acc + *x * *y));
        }
        let mut acc = T::zero();
        u.for_each_nonzero(&mut |i, x| acc = acc + x * v.get_quick(i));
        Ok(acc)
    }

    fn norm2<V: Matrix1D<T>>(&self, v: &V) -> T::Real {
        let start = (T::Real::zero(), T::Real::one());
        let (scale, ssq) = match v.as_slice() {
            Some(s) => {
                #[cfg(feature = "rayon")]
                {
                    if let Some(pool) = self.pool_for(s.len()) {
                        use rayon::prelude::*;
                        let (scale, ssq) = pool.install(|| {
                            s.par_iter()
                                .fold(|| start, |acc, x| ssq_update(acc, x.to_real()))
                                .reduce(|| start, ssq_merge)
                        });
                        return scale * ssq.sqrt();
                    }
                }
                s.iter().fold(start, |acc, x| ssq_update(acc, x.to_real()))
            }
            None => {
                let mut acc = start;
                v.for_each_nonzero(&mut |_, x| acc = ssq_update(acc, x.to_real()));
                acc
            }
        };
        scale * ssq.sqrt()
    }
}

/// One step of the scaled sum of squares: the pair `(scale, ssq)` represents
/// `scale² · ssq`.
fn ssq_update<R: Float>((scale, ssq): (R, R), x: R) -> (R, R) {
    if x == R::zero() {
        return (scale, ssq);
    }
    let a = x.abs();
    if scale < a {
        let r = scale / a;
        (a, R::one() + ssq * r * r)
    } else {
        let r = a / scale;
        (scale, ssq + r * r)
    }
}

fn ssq_merge<R: Float>((s1, q1): (R, R), (s2, q2): (R, R)) -> (R, R) {
    if s1 == R::zero() {
        return (s2, q2);
    }
    if s2 == R::zero() {
        return (s1, q1);
    }
    if s1 >= s2 {
        let r = s2 / s1;
        (s1, q1 + q2 * r * r)
    } else {
        let r = s1 / s2;
        (s2, q2 + q1 * r * r)
    }
}

/// Euclidean norm of `v` using the global kernel configuration.
pub fn norm2<T: Scalar, V: Matrix1D<T>>(v: &V) -> T::Real {
    KernelConfig::global().norm2(v)
}

/// Inner product of `u` and `v` using the global kernel configuration.
pub fn dot<T: Scalar, U: Matrix1D<T>, V: Matrix1D<T>>(u: &U, v: &V) -> Result<T, KError> {
    KernelConfig::global().dot(u, v)
}

/// `y ← alpha · op(A) · x + beta · y` using the global kernel configuration.
pub fn multiply<T, M, X, Y>(a: &M, x: &X, y: &mut Y, alpha: T, beta: T, transpose: bool) -> Result<(), KError>
where
    T: Scalar,
    M: Matrix2D<T>,
    X: Matrix1D<T>,
    Y: Matrix1D<T>,
{
    a.z_mult(KernelConfig::global(), x, y, alpha, beta, transpose)
}

/// Validates `op(A) · x → y` and returns the shape `(m, n)` of `op(A)`.
pub(crate) fn check_mult_shapes<M, X, Y>(a: &M, x: &X, y: &Y, transpose: bool) -> Result<(usize, usize), KError>
where
    M: MatShape + ?Sized,
    X: Indexing + ?Sized,
    Y: Indexing + ?Sized,
{
    let (m, n) = if transpose { (a.ncols(), a.nrows()) } else { (a.nrows(), a.ncols()) };
    if x.size() != n {
        return Err(KError::ShapeMismatch(format!(
            "{}x{} operator applied to vector of size {}",
            m,
            n,
            x.size()
        )));
    }
    if y.size() != m {
        return Err(KError::ShapeMismatch(format!(
            "{}x{} operator writes into vector of size {}",
            m,
            n,
            y.size()
        )));
    }
    Ok((m, n))
}

/// `y ← beta · y`, with `beta = 0` clearing `y` even if it holds NaN.
pub(crate) fn prepare_output<T: Scalar, Y: Matrix1D<T>>(y: &mut Y, beta: T) -> Result<(), KError> {
    if beta == T::zero() {
        y.assign(T::zero())?;
    } else if beta != T::one() {
        y.assign_fn(|v| v * beta)?;
    }
    Ok(())
}

/// `y[i] ← y[i] + v`
#[inline]
pub(crate) fn accumulate<T: Scalar, Y: Matrix1D<T>>(y: &mut Y, i: usize, v: T) -> Result<(), KError> {
    match y.as_mut_slice() {
        Some(s) => {
            s[i] = s[i] + v;
            Ok(())
        }
        None => {
            let cur = y.get_quick(i);
            y.set_quick(i, cur + v)
        }
    }
}

/// Product driven by `for_each_nonzero`, shared by the coordinate sparse
/// layouts: every stored `a_ij` adds `alpha · a_ij · x[j]` to `y[i]`.
pub(crate) fn scatter_mult<T, M, X, Y>(a: &M, x: &X, y: &mut Y, alpha: T, beta: T, transpose: bool) -> Result<(), KError>
where
    T: Scalar,
    M: Matrix2D<T>,
    X: Matrix1D<T>,
    Y: Matrix1D<T>,
{
    check_mult_shapes(a, x, y, transpose)?;
    prepare_output(y, beta)?;
    let mut status = Ok(());
    a.for_each_nonzero(&mut |i, j, v| {
        if status.is_ok() {
            let (r, c) = if transpose { (j, i) } else { (i, j) };
            status = accumulate(y, r, alpha * v * x.get_quick(c));
        }
    });
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::vector::{DenseVector, SparseVector};

    #[test]
    fn norm2_survives_extreme_scales() {
        let big = DenseVector::from(vec![1e200f64, 1e200]);
        let n = norm2(&big);
        assert!((n / 1e200 - 2f64.sqrt()).abs() < 1e-12);
        let tiny = DenseVector::from(vec![3e-200f64, 4e-200]);
        assert!((norm2(&tiny) / 5e-200 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn norm2_of_integers_is_f64() {
        let v = DenseVector::from(vec![3i32, 4]);
        assert_eq!(norm2(&v), 5.0);
    }

    #[test]
    fn sparse_dot_and_norm() {
        let mut s = SparseVector::<f64>::new(5);
        s.set(1, 2.0).unwrap();
        s.set(4, -1.0).unwrap();
        let d = DenseVector::from(vec![1.0, 1.0, 1.0, 1.0, 3.0]);
        assert_eq!(dot(&s, &d).unwrap(), -1.0);
        assert!((norm2(&s) - 5f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn dot_rejects_mismatched_lengths() {
        let a = DenseVector::from(vec![1.0f32, 2.0]);
        let b = DenseVector::from(vec![1.0f32]);
        assert!(matches!(dot(&a, &b), Err(KError::ShapeMismatch(_))));
    }

    #[test]
    fn parallel_and_serial_reductions_agree() {
        let v = DenseVector::from_fn(10_000, |i| ((i % 17) as f64) - 8.0);
        let serial = KernelConfig::serial();
        let parallel = KernelConfig::with_threads(4).unwrap().with_min_parallel_len(16);
        let ns: f64 = serial.norm2(&v);
        let np: f64 = parallel.norm2(&v);
        assert!((ns - np).abs() < 1e-9 * ns);
        let ds: f64 = serial.dot(&v, &v).unwrap();
        let dp: f64 = parallel.dot(&v, &v).unwrap();
        assert!((ds - dp).abs() < 1e-9 * ds);
    }
}
