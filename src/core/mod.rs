//! Element types, storage traits, element-wise transforms and the algebra kernel.

pub mod functions;
pub mod kernel;
pub mod scalar;
pub mod traits;

pub use kernel::{InnerProduct, dot, multiply, norm2};
pub use scalar::Scalar;
pub use traits::{Indexing, MatShape, MatVec, Matrix1D, Matrix2D};
