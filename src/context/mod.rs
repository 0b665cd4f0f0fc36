//! Context types for configuring solver and preconditioner pipelines.
//!
//! - [`ksp_context`]: `KspContext`, which owns the matrix, preconditioner and
//!   GLSQR options and runs solves.
//! - [`pc_context`]: the `PC` enum naming a preconditioner and its parameters.
//!
//! # Example
//! ```rust
//! use krylith::context::{KspContext, pc_context::PC};
//! use krylith::matrix::{DenseMatrix, DenseVector};
//!
//! let a = DenseMatrix::from_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
//! let mut ksp = KspContext::new(a).with_pc(PC::Ilut { fill: 5, droptol: 0.0 });
//! let b = DenseVector::from(vec![1.0, 2.0]);
//! let mut x = DenseVector::from(vec![1.0, 0.0]);
//! let stats = ksp.solve(&b, &mut x).unwrap();
//! assert!(stats.converged);
//! ```
//!
//! # References
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::KspContext;
pub mod pc_context;
pub use pc_context::PC;
