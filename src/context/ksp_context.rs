//! Krylov solver context.
//!
//! `KspContext` owns the system matrix, an optional preconditioner and the
//! [`KspOptions`], and drives a [`GlsqrSolver`]:
//!
//! 1. Construct with [`KspContext::new`] and the `with_*` builders.
//! 2. Call [`KspContext::setup`] (or let the first `solve` do it) to factor the
//!    preconditioner.
//! 3. Call [`KspContext::solve`] as often as needed; the factorization is reused.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.

use crate::config::options::KspOptions;
use crate::context::pc_context::PC;
use crate::core::scalar::Scalar;
use crate::core::traits::Matrix2D;
use crate::error::KError;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;
use crate::preconditioner::Preconditioner;
use crate::solver::{GlsqrSolver, LinearSolver};
use crate::utils::convergence::SolveStats;
use num_traits::Float;

/// Matrix, preconditioner and options for repeated GLSQR solves.
pub struct KspContext<M, T> {
    /// The system matrix
    pub a: M,
    /// Optional preconditioner, set up once before the first solve
    pub pc: Option<Box<dyn Preconditioner<M, DenseVector<T>>>>,
    pub options: KspOptions,
    kernel: KernelConfig,
    solver: Option<GlsqrSolver<T>>,
    ready: bool,
}

impl<M, T> KspContext<M, T>
where
    M: Matrix2D<T>,
    T: Scalar<Real = T> + Float,
{
    pub fn new(a: M) -> Self {
        Self {
            a,
            pc: None,
            options: KspOptions::default(),
            kernel: KernelConfig::default(),
            solver: None,
            ready: false,
        }
    }

    pub fn with_options(mut self, options: KspOptions) -> Self {
        self.options = options;
        self.ready = false;
        self
    }

    /// Uses the preconditioner named by `pc`.
    pub fn with_pc(self, pc: PC<T>) -> Self {
        let built = pc.build::<M>();
        self.with_boxed_pc(built)
    }

    /// Uses a caller-provided preconditioner.
    pub fn with_preconditioner<P>(self, pc: P) -> Self
    where
        P: Preconditioner<M, DenseVector<T>> + 'static,
    {
        self.with_boxed_pc(Some(Box::new(pc)))
    }

    fn with_boxed_pc(mut self, pc: Option<Box<dyn Preconditioner<M, DenseVector<T>>>>) -> Self {
        self.pc = pc;
        self.ready = false;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self.ready = false;
        self
    }

    /// Sets up the preconditioner and builds the solver from the options.
    pub fn setup(&mut self) -> Result<(), KError> {
        let rel_tol = T::from_f64(self.options.rel_tol)
            .ok_or_else(|| KError::InvalidInput(format!("tolerance {} not representable", self.options.rel_tol)))?;
        if let Some(pc) = self.pc.as_mut() {
            pc.setup(&self.a)?;
        }
        self.solver = Some(
            GlsqrSolver::with_tolerance(rel_tol)
                .with_max_iters(self.options.max_iters)
                .with_kernel(self.kernel.clone()),
        );
        self.ready = true;
        log::debug!(
            "ksp setup: {}x{} matrix, preconditioned = {}",
            self.a.nrows(),
            self.a.ncols(),
            self.pc.is_some()
        );
        Ok(())
    }

    /// Solves `A x = b`; `x` holds the initial direction on entry.
    pub fn solve(&mut self, b: &DenseVector<T>, x: &mut DenseVector<T>) -> Result<SolveStats<T>, KError> {
        if !self.ready {
            self.setup()?;
        }
        let solver = self
            .solver
            .as_mut()
            .ok_or_else(|| KError::InvalidInput("solver context not set up".into()))?;
        solver.solve(&self.a, self.pc.as_deref(), b, x)
    }

    /// Residual estimate of the last solve.
    pub fn residual_norm(&self) -> Option<T> {
        self.solver.as_ref().and_then(|s| s.residual_norm())
    }
}
