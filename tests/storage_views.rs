//! Every storage layout against the same logical matrix.
//!
//! Each layout is filled with the same 5×4 pattern and checked for copy
//! fidelity, double-transpose views, and matrix-vector products that agree
//! with the dense row-major reference.

use approx::assert_abs_diff_eq;
use krylith::core::{MatShape, Matrix1D, Matrix2D, multiply};
use krylith::matrix::{
    CompressedMatrix, DenseLargeMatrix, DenseMatrix, DenseVector, DiagonalMatrix, Layout, MultiCompressedMatrix,
    Orientation, Shared, TripletMatrix,
};

const ROWS: usize = 5;
const COLS: usize = 4;

fn entry(i: usize, j: usize) -> f64 {
    if (i + 2 * j) % 3 == 0 { (i * COLS + j) as f64 + 1.0 } else { 0.0 }
}

fn fill<S: Matrix2D<f64>>(mut m: S) -> S {
    for i in 0..ROWS {
        for j in 0..COLS {
            let v = entry(i, j);
            if v != 0.0 {
                m.set(i, j, v).unwrap();
            }
        }
    }
    m
}

fn reference() -> DenseMatrix<f64> {
    DenseMatrix::from_fn(ROWS, COLS, entry)
}

fn check_layout<S: Matrix2D<f64>>(m: S) {
    let reference = reference();
    assert!(m.equals(&reference));
    assert!(m.copy().unwrap().equals(&reference));
    assert_eq!(m.cardinality(), reference.cardinality());

    let x = DenseVector::from(vec![1.0, -2.0, 0.5, 3.0]);
    let u = DenseVector::from(vec![0.5, 1.0, -1.0, 2.0, 1.5]);
    let (mut y, mut y_ref) = (DenseVector::zeros(ROWS), DenseVector::zeros(ROWS));
    multiply(&m, &x, &mut y, 2.0, 0.0, false).unwrap();
    multiply(&reference, &x, &mut y_ref, 2.0, 0.0, false).unwrap();
    let (mut z, mut z_ref) = (DenseVector::from(vec![1.0; COLS]), DenseVector::from(vec![1.0; COLS]));
    multiply(&m, &u, &mut z, 1.0, -1.0, true).unwrap();
    multiply(&reference, &u, &mut z_ref, 1.0, -1.0, true).unwrap();
    for i in 0..ROWS {
        assert_abs_diff_eq!(y[i], y_ref[i], epsilon = 1e-12);
    }
    for j in 0..COLS {
        assert_abs_diff_eq!(z[j], z_ref[j], epsilon = 1e-12);
    }

    let shared = Shared::new(m);
    let tt = shared.view_transpose().view_transpose();
    assert!(tt.equals(&reference));
    assert!(tt == shared.view());
    let t = shared.view_transpose();
    assert_eq!((t.nrows(), t.ncols()), (COLS, ROWS));
    for i in 0..ROWS {
        for j in 0..COLS {
            assert_eq!(t.get(j, i).unwrap(), entry(i, j));
        }
    }
}

#[test]
fn dense_row_and_column_major() {
    check_layout(fill(DenseMatrix::new(ROWS, COLS)));
    check_layout(fill(DenseMatrix::with_layout(ROWS, COLS, Layout::ColumnMajor)));
}

#[test]
fn dense_large_small_blocks() {
    check_layout(fill(DenseLargeMatrix::with_block_len(ROWS, COLS, 3).unwrap()));
}

#[test]
fn compressed_both_orientations() {
    check_layout(fill(CompressedMatrix::new(ROWS, COLS, Orientation::Row)));
    check_layout(fill(CompressedMatrix::new(ROWS, COLS, Orientation::Column)));
}

#[test]
fn multi_value_both_orientations() {
    check_layout(fill(MultiCompressedMatrix::new(ROWS, COLS, Orientation::Row)));
    check_layout(fill(MultiCompressedMatrix::new(ROWS, COLS, Orientation::Column)));
}

#[test]
fn triplet_and_its_compression() {
    let t = fill(TripletMatrix::new(ROWS, COLS));
    check_layout(t.to_compressed(Orientation::Column));
    check_layout(t);
}

#[test]
fn triplet_duplicates_accumulate() {
    let mut t = TripletMatrix::new(2, 2);
    t.push(0, 1, 1.5).unwrap();
    t.push(0, 1, 2.5).unwrap();
    t.push(1, 0, 1.0).unwrap();
    t.push(1, 0, -1.0).unwrap();
    assert_eq!(t.get(0, 1).unwrap(), 4.0);
    let c = t.to_compressed(Orientation::Row);
    assert_eq!(c.nnz(), 1);
    assert_eq!(t.to_dense().get(0, 1).unwrap(), 4.0);
}

#[test]
fn diagonal_offset_three() {
    let mut d = DiagonalMatrix::<f64>::new(5, 5, 3);
    assert_eq!(d.diagonal_length(), 2);
    d.set(0, 3, 7.0).unwrap();
    d.set(1, 4, 8.0).unwrap();
    for i in 0..5 {
        for j in 0..5 {
            if j as isize - i as isize != 3 {
                assert_eq!(d.get(i, j).unwrap(), 0.0);
            }
        }
    }
    assert!(d.copy().unwrap().equals(&d));
    let dense = d.to_dense();
    let shared = Shared::new(d);
    let tt = shared.view_transpose().view_transpose();
    assert!(tt.equals(&dense));
    assert_eq!(shared.view_transpose().get(4, 1).unwrap(), 8.0);
}

#[test]
fn view_writes_reach_every_alias() {
    let shared = Shared::new(reference());
    let mut part = shared.view_part(1, 1, 3, 2).unwrap();
    part.assign(-1.0).unwrap();
    let row = shared.view_row(2).unwrap();
    assert_eq!(row.to_dense().as_ref(), &[entry(2, 0), -1.0, -1.0, entry(2, 3)]);
    let col = shared.view_transpose().view_row(1).unwrap();
    assert_eq!(col.get(3).unwrap(), -1.0);
    assert_eq!(col.get(4).unwrap(), entry(4, 1));
}
