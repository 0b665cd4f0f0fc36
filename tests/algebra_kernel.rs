//! Algebra kernel properties on random operands.
//!
//! Products with `op(A) = Aᵗ` are checked against an explicitly transposed
//! copy, norms against scaling, and f32 kernels against f64 ones.

use approx::assert_abs_diff_eq;
use krylith::core::{Indexing, InnerProduct, MatShape, Matrix2D, multiply, norm2};
use krylith::matrix::{CompressedMatrix, DenseMatrix, DenseVector, Orientation, Shared};
use krylith::parallel::KernelConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_dense(rng: &mut StdRng, rows: usize, cols: usize) -> DenseMatrix<f64> {
    DenseMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

fn random_vec(rng: &mut StdRng, n: usize) -> DenseVector<f64> {
    DenseVector::from_fn(n, |_| rng.gen_range(-1.0..1.0))
}

fn transposed(a: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    DenseMatrix::from_fn(a.ncols(), a.nrows(), |i, j| a.get(j, i).unwrap())
}

#[test]
fn transpose_flag_matches_explicit_transpose() {
    let mut rng = StdRng::seed_from_u64(7);
    for &(m, n) in &[(1, 1), (3, 7), (12, 5), (20, 20)] {
        let a = random_dense(&mut rng, m, n);
        let at = transposed(&a);
        let x = random_vec(&mut rng, n);
        // y = A x, then z = Aᵗ y both ways
        let mut y = DenseVector::zeros(m);
        multiply(&a, &x, &mut y, 1.0, 0.0, false).unwrap();
        let (mut z1, mut z2) = (DenseVector::zeros(n), DenseVector::zeros(n));
        multiply(&a, &y, &mut z1, 1.0, 0.0, true).unwrap();
        multiply(&at, &y, &mut z2, 1.0, 0.0, false).unwrap();
        for i in 0..n {
            assert_abs_diff_eq!(z1[i], z2[i], epsilon = 1e-6);
        }
    }
}

#[test]
fn transposed_view_and_sparse_agree_with_dense() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_dense(&mut rng, 9, 6);
    let mut sparse = CompressedMatrix::new(9, 6, Orientation::Column);
    for i in 0..9 {
        for j in 0..6 {
            if (i + j) % 2 == 0 {
                sparse.set(i, j, a.get(i, j).unwrap()).unwrap();
            }
        }
    }
    let masked = DenseMatrix::from_fn(9, 6, |i, j| if (i + j) % 2 == 0 { a.get(i, j).unwrap() } else { 0.0 });
    let u = random_vec(&mut rng, 9);
    let (mut z1, mut z2) = (DenseVector::from(vec![1.0; 6]), DenseVector::from(vec![1.0; 6]));
    multiply(&sparse, &u, &mut z1, -0.5, 2.0, true).unwrap();
    let shared = Shared::new(masked);
    let view = shared.view_transpose();
    multiply(&view, &u, &mut z2, -0.5, 2.0, false).unwrap();
    for j in 0..6 {
        assert_abs_diff_eq!(z1[j], z2[j], epsilon = 1e-12);
    }
}

#[test]
fn norm_is_scale_invariant() {
    let mut rng = StdRng::seed_from_u64(3);
    let v = random_vec(&mut rng, 257);
    let n = norm2(&v);
    for &k in &[-3.5, 1e-150, 2.0, 1e150] {
        let w = DenseVector::from_fn(v.size(), |i| k * v[i]);
        let nw: f64 = norm2(&w);
        assert_abs_diff_eq!(nw / (k.abs() * n), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn single_precision_tracks_double() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_dense(&mut rng, 8, 8);
    let x = random_vec(&mut rng, 8);
    let a32 = DenseMatrix::from_fn(8, 8, |i, j| a.get(i, j).unwrap() as f32);
    let x32 = DenseVector::from_fn(8, |i| x[i] as f32);
    let (mut y, mut y32) = (DenseVector::zeros(8), DenseVector::zeros(8));
    multiply(&a, &x, &mut y, 1.0, 0.0, false).unwrap();
    multiply(&a32, &x32, &mut y32, 1.0, 0.0, false).unwrap();
    for i in 0..8 {
        assert_abs_diff_eq!(y32[i] as f64, y[i], epsilon = 1e-4);
    }
    assert_abs_diff_eq!(norm2(&y32) as f64, norm2(&y), epsilon = 1e-4);
}

#[test]
fn explicit_pool_matches_global() {
    let mut rng = StdRng::seed_from_u64(9);
    let a = random_dense(&mut rng, 300, 40);
    let x = random_vec(&mut rng, 40);
    let cfg = KernelConfig::with_threads(3).unwrap().with_min_parallel_len(8);
    let (mut y1, mut y2) = (DenseVector::zeros(300), DenseVector::zeros(300));
    a.z_mult(&cfg, &x, &mut y1, 1.0, 0.0, false).unwrap();
    a.z_mult(&KernelConfig::serial(), &x, &mut y2, 1.0, 0.0, false).unwrap();
    for i in 0..300 {
        assert_abs_diff_eq!(y1[i], y2[i], epsilon = 1e-12);
    }
    let d1: f64 = cfg.dot(&y1, &y1).unwrap();
    assert_abs_diff_eq!(d1, KernelConfig::serial().dot(&y2, &y2).unwrap(), epsilon = 1e-9 * d1);
}
