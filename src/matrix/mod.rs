//! Matrix and vector storage: dense, dense-large, diagonal, triplet,
//! compressed (RC/CC), multi-value compressed (RCM/CCM), and views.

pub mod dense;
pub mod dense_large;
pub mod diagonal;
pub mod multi;
pub mod sparse;
pub mod triplet;
pub mod vector;
pub mod view;

pub use dense::{DenseMatrix, Layout};
pub use dense_large::DenseLargeMatrix;
pub use diagonal::DiagonalMatrix;
pub use multi::{MultiCompressedMatrix, SparseLine};
pub use sparse::{CompressedMatrix, Orientation};
pub use triplet::TripletMatrix;
pub use vector::{DenseVector, SparseVector};
pub use view::{LineView, MatrixView, Shared, VectorView};
