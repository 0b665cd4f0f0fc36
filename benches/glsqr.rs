use criterion::{black_box, Criterion, criterion_group, criterion_main};
use faer::linalg::solvers::SolveCore;
use krylith::core::multiply;
use krylith::matrix::{CompressedMatrix, DenseMatrix, DenseVector, Orientation, TripletMatrix};
use krylith::preconditioner::{Ilut, Preconditioner};
use krylith::solver::{GlsqrSolver, LinearSolver};

fn banded(n: usize) -> CompressedMatrix<f64> {
    let mut t = TripletMatrix::new(n, n);
    for i in 0..n {
        t.push(i, i, 4.0).unwrap();
        if i > 0 {
            t.push(i, i - 1, -1.5).unwrap();
        }
        if i + 1 < n {
            t.push(i, i + 1, -1.0).unwrap();
        }
    }
    t.to_compressed(Orientation::Row)
}

fn bench_glsqr(c: &mut Criterion) {
    let n = 2000;
    let a = banded(n);
    let mut b = DenseVector::zeros(n);
    multiply(&a, &DenseVector::from_fn(n, |i| (i as f64).sin()), &mut b, 1.0, 0.0, false).unwrap();
    let x0 = DenseVector::from_fn(n, |i| if i == 0 { 1.0 } else { 0.0 });

    c.bench_function("glsqr sparse", |ben| {
        ben.iter(|| {
            let mut x = x0.clone();
            let _stats = GlsqrSolver::with_tolerance(1e-10).solve(black_box(&a), None, black_box(&b), &mut x).unwrap();
        })
    });

    let mut ilut = Ilut::new(5, 1e-4);
    ilut.setup(&a).unwrap();
    let pc: &dyn Preconditioner<CompressedMatrix<f64>, DenseVector<f64>> = &ilut;
    c.bench_function("glsqr sparse + ilut", |ben| {
        ben.iter(|| {
            let mut x = x0.clone();
            let _stats = GlsqrSolver::with_tolerance(1e-10).solve(black_box(&a), Some(pc), black_box(&b), &mut x).unwrap();
        })
    });
}

fn bench_dense_vs_faer(c: &mut Criterion) {
    let n = 200;
    let a = DenseMatrix::from_fn(n, n, |i, j| if i == j { n as f64 } else { ((i * n + j) as f64).sin() });
    let b = DenseVector::from_fn(n, |i| (i as f64).cos());
    let x0 = DenseVector::from_fn(n, |i| if i == 0 { 1.0 } else { 0.0 });

    c.bench_function("glsqr dense", |ben| {
        ben.iter(|| {
            let mut x = x0.clone();
            let _stats = GlsqrSolver::with_tolerance(1e-10).solve(black_box(&a), None, black_box(&b), &mut x).unwrap();
        })
    });

    let af = a.to_faer();
    c.bench_function("faer raw LU", |ben| {
        ben.iter(|| {
            let factor = faer::linalg::solvers::FullPivLu::new(af.as_ref());
            let mut y = b.clone().into_vec();
            let y_mat = faer::MatMut::from_column_major_slice_mut(&mut y, n, 1);
            factor.solve_in_place_with_conj(faer::Conj::No, y_mat);
        })
    });
}

criterion_group!(benches, bench_glsqr, bench_dense_vs_faer);
criterion_main!(benches);
