//! Krylov solver interfaces.

use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for iterative solvers.
pub trait LinearSolver<M, V> {
    type Scalar;

    /// Solve A·x = b, writing the result into `x`.
    ///
    /// `x` also carries the solver's starting data on entry (for GLSQR the
    /// initial Lanczos direction). Returns iteration stats.
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, KError>;
}

pub mod glsqr;
pub use glsqr::{GlsqrSolver, LanczosParity};
