//! krylith: matrix storage with zero-copy views and a generalized LSQR solver
//!
//! This crate provides dense, banded and sparse matrix layouts behind one
//! element-access contract, views that alias their backing storage, a
//! parallel algebra kernel, and the GLSQR Krylov solver with pluggable
//! preconditioners (identity and ILUT).
//!
//! ```rust
//! use krylith::{DenseMatrix, DenseVector, GlsqrSolver, LinearSolver};
//!
//! let a = DenseMatrix::from_rows(&[vec![2.0_f64, 0.0], vec![0.0, 4.0]]).unwrap();
//! let b = DenseVector::from(vec![2.0, 8.0]);
//! let mut x = DenseVector::from(vec![1.0, 1.0]);
//! let mut solver = GlsqrSolver::new();
//! let stats = solver.solve(&a, None, &b, &mut x).unwrap();
//! assert!(stats.converged);
//! assert!((x[0] - 1.0).abs() < 1e-8 && (x[1] - 2.0).abs() < 1e-8);
//! ```

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::{KspOptions, PcOptions};
pub use context::{KspContext, PC};
pub use crate::core::{InnerProduct, MatShape, Matrix1D, Matrix2D, Scalar};
pub use error::{KError, NotConvergedReason};
pub use matrix::*;
pub use parallel::KernelConfig;
pub use preconditioner::{Identity, Ilut, Preconditioner};
pub use solver::{GlsqrSolver, LanczosParity, LinearSolver};
pub use utils::{IterationMonitor, MonitorState};

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
