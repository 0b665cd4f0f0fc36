//! Generalized LSQR (GLSQR) solver.
//!
//! GLSQR solves `A x = b` for large, possibly ill-posed or rectangular `A`.
//! Two coupled three-term Lanczos recurrences build bases `{uₖ}` (from `A`)
//! and `{vₖ}` (from `Aᵗ`) that reduce `A` to a tridiagonal form; the
//! iterate is updated with a short recurrence over Givens rotations, so each
//! iteration costs one product with `A`, one with `Aᵗ` and a handful of
//! vector operations.
//!
//! The vector passed in `x` is the initial direction `v₁`; a zero vector is
//! replaced by the normalized all-ones vector. With a preconditioner `M` the
//! recurrences run on `B = A M⁻¹` and the result is mapped back with
//! `x = M⁻¹ y`.
//!
//! # Stopping
//!
//! The residual estimate `|φ̂|` is checked by the [`IterationMonitor`] at the
//! top of every iteration. A (near) zero normalization, a *breakdown*, ends
//! the iteration without an error: the current iterate is returned and the
//! stats report `breakdown = true`.
//!
//! # References
//! - Reichel, L. & Ye, Q. (2008). A generalized LSQR algorithm. Numer. Linear Algebra Appl. 15, 643–660.

use crate::core::functions::{div, minus_mult, plus_mult_second};
use crate::core::kernel::InnerProduct;
use crate::core::scalar::Scalar;
use crate::core::traits::{Indexing, Matrix1D, Matrix2D};
use crate::error::KError;
use crate::matrix::vector::DenseVector;
use crate::parallel::KernelConfig;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{IterationMonitor, SolveStats};
use num_traits::Float;

/// State of the `v` recurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanczosParity {
    /// Both `v` normalizations are live.
    SemiOrthogonal,
    /// The `v₁` normalization collapsed; the next collapse ends the iteration.
    BreakdownPending,
}

/// GLSQR solver struct.
pub struct GlsqrSolver<T> {
    pub monitor: IterationMonitor<T>,
    /// Relative tolerance; negative selects `sqrt(ε) · ‖Bᵗ b‖` per solve.
    rel_tol: T,
    kernel: KernelConfig,
    phi_hat: Option<T>,
}

impl<T: Scalar + Float> Default for GlsqrSolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar + Float> GlsqrSolver<T> {
    /// Solver with the automatic relative tolerance.
    pub fn new() -> Self {
        Self {
            monitor: IterationMonitor::new(),
            rel_tol: -T::one(),
            kernel: KernelConfig::default(),
            phi_hat: None,
        }
    }

    /// Solver with a fixed relative tolerance.
    pub fn with_tolerance(rel_tol: T) -> Self {
        Self { rel_tol, ..Self::new() }
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.monitor.max_iters = max_iters;
        self
    }

    /// Runs the kernels on `kernel` instead of the process-wide configuration.
    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn rel_tol(&self) -> T {
        self.rel_tol
    }

    /// `|φ̂|` from the last solve, `None` before any solve evaluated it.
    pub fn residual_norm(&self) -> Option<T> {
        self.phi_hat.map(Float::abs)
    }
}

/// `out ← Bᵗ u = M⁻ᵗ Aᵗ u`
fn apply_bt<T, M>(
    cfg: &KernelConfig,
    a: &M,
    pc: Option<&dyn Preconditioner<M, DenseVector<T>>>,
    u: &DenseVector<T>,
    tmp: &mut DenseVector<T>,
    out: &mut DenseVector<T>,
) -> Result<(), KError>
where
    T: Scalar,
    M: Matrix2D<T>,
{
    match pc {
        Some(pc) => {
            a.z_mult(cfg, u, tmp, T::one(), T::zero(), true)?;
            pc.apply_transpose(tmp, out)
        }
        None => a.z_mult(cfg, u, out, T::one(), T::zero(), true),
    }
}

/// `out ← B v = A M⁻¹ v`
fn apply_b<T, M>(
    cfg: &KernelConfig,
    a: &M,
    pc: Option<&dyn Preconditioner<M, DenseVector<T>>>,
    v: &DenseVector<T>,
    tmp: &mut DenseVector<T>,
    out: &mut DenseVector<T>,
) -> Result<(), KError>
where
    T: Scalar,
    M: Matrix2D<T>,
{
    match pc {
        Some(pc) => {
            pc.apply(v, tmp)?;
            a.z_mult(cfg, tmp, out, T::one(), T::zero(), false)
        }
        None => a.z_mult(cfg, v, out, T::one(), T::zero(), false),
    }
}

impl<M, T> LinearSolver<M, DenseVector<T>> for GlsqrSolver<T>
where
    M: Matrix2D<T>,
    T: Scalar<Real = T> + Float,
{
    type Scalar = T;

    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, DenseVector<T>>>,
        b: &DenseVector<T>,
        x: &mut DenseVector<T>,
    ) -> Result<SolveStats<T>, KError> {
        let (m, n) = (a.nrows(), a.ncols());
        if n != x.size() {
            return Err(KError::ShapeMismatch(format!("A.ncols() = {} != x.size() = {}", n, x.size())));
        }
        if b.size() != m {
            return Err(KError::ShapeMismatch(format!("b.size() = {} != A.nrows() = {}", b.size(), m)));
        }
        if x.iter().any(|v| v.is_non_finite()) {
            return Err(KError::InvalidInput("initial vector contains NaN or infinity".into()));
        }
        let cfg = &self.kernel;
        let eps = T::epsilon();

        let mut phi_hat = cfg.norm2(b);
        if phi_hat == T::zero() || n == 0 {
            // Nothing to reduce: b = 0 gives x = 0 immediately.
            x.assign(T::zero())?;
            self.phi_hat = Some(phi_hat);
            self.monitor.set_first();
            let converged = self.monitor.converged(phi_hat).unwrap_or(false);
            log::debug!("glsqr: trivial system, ‖b‖ = {}", phi_hat);
            return Ok(SolveStats { converged, ..SolveStats::trivial(phi_hat) });
        }

        let mut v1 = x.clone();
        let rho = cfg.norm2(&v1);
        if rho != T::zero() {
            v1.assign_fn(div(rho))?;
        } else {
            log::warn!("glsqr: initial direction is zero, starting from the normalized ones vector");
            v1.assign(T::one())?;
            let r = cfg.norm2(&v1);
            v1.assign_fn(div(r))?;
        }

        let mut u1 = b.clone();
        u1.assign_fn(div(phi_hat))?;
        let (mut u0, mut u_1) = (DenseVector::zeros(m), DenseVector::zeros(m));
        let (mut v0, mut v_1) = (DenseVector::zeros(n), DenseVector::zeros(n));
        let (mut w0, mut w_1, mut w_2) = (DenseVector::zeros(n), DenseVector::zeros(n), DenseVector::zeros(n));
        let (mut x0, mut x_1) = (DenseVector::zeros(n), DenseVector::zeros(n));
        let mut z = DenseVector::zeros(n);
        let mut z1 = DenseVector::zeros(m);
        let mut tmp = DenseVector::zeros(n);

        self.monitor.rel_tol = if self.rel_tol < T::zero() {
            apply_bt(cfg, a, pc, b, &mut tmp, &mut z)?;
            eps.sqrt() * cfg.norm2(&z)
        } else {
            self.rel_tol
        };

        let one = T::one();
        let (mut rho0, mut rho_1) = (one, one);
        let (mut c0, mut c_1) = (-one, -one);
        let (mut s0, mut s_1) = (T::zero(), T::zero());
        let mut rho_2: T;
        let mut c_2: T;
        let mut s_2: T;
        let mut parity = LanczosParity::SemiOrthogonal;
        let mut breakdown = false;
        let mut iterations = 0;

        self.monitor.set_first();
        let status = loop {
            match self.monitor.converged(phi_hat) {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => break Err(e),
            }
            // time shift
            u_1.assign_from(&u0)?;
            u0.assign_from(&u1)?;
            v_1.assign_from(&v0)?;
            v0.assign_from(&v1)?;
            c_2 = c_1;
            c_1 = c0;
            s_2 = s_1;
            s_1 = s0;
            x_1.assign_from(&x0)?;
            w_2.assign_from(&w_1)?;
            w_1.assign_from(&w0)?;
            rho_2 = rho_1;
            rho_1 = rho0;

            // Lanczos bi-tridiagonalization
            apply_bt(cfg, a, pc, &u0, &mut tmp, &mut z)?;
            let sigma_1 = cfg.dot(&v_1, &z)?;
            z.assign_with(&v_1, minus_mult(sigma_1))?;
            match parity {
                LanczosParity::SemiOrthogonal => {
                    let sigma0 = cfg.dot(&v0, &z)?;
                    z.assign_with(&v0, minus_mult(sigma0))?;
                    let sigma1 = cfg.norm2(&z);
                    if sigma1 > eps {
                        v1.assign_from(&z)?.assign_fn(div(sigma1))?;
                    } else {
                        log::warn!("glsqr: v-recurrence breakdown at iteration {}", iterations);
                        parity = LanczosParity::BreakdownPending;
                    }
                }
                LanczosParity::BreakdownPending => {
                    let sigma0 = cfg.norm2(&z);
                    if sigma0 > eps {
                        v0.assign_from(&z)?.assign_fn(div(sigma0))?;
                    } else {
                        breakdown = true;
                        break Ok(());
                    }
                }
            }
            apply_b(cfg, a, pc, &v0, &mut tmp, &mut z1)?;
            let tau_1 = cfg.dot(&u_1, &z1)?;
            z1.assign_with(&u_1, minus_mult(tau_1))?;
            let tau0 = cfg.dot(&u0, &z1)?;
            z1.assign_with(&u0, minus_mult(tau0))?;
            let tau1 = cfg.norm2(&z1);
            if tau1 > eps {
                u1.assign_from(&z1)?.assign_fn(div(tau1))?;
            }

            // solution update
            let gamma = s_2 * tau_1;
            let psi = -c_1 * c_2 * tau_1 + s_1 * tau0;
            let rho_hat = -s_1 * c_2 * tau_1 - c_1 * tau0;
            let rho = rho_hat.hypot(tau1);
            // A vanishing rotation keeps the previous iterate.
            if rho <= eps {
                breakdown = true;
                break Ok(());
            }
            rho0 = rho;
            c0 = rho_hat / rho0;
            s0 = tau1 / rho0;
            let phi = c0 * phi_hat;
            phi_hat = s0 * phi_hat;
            w0.assign_from(&v0)?
                .assign_with(&w_1, minus_mult(psi / rho_1))?
                .assign_with(&w_2, minus_mult(gamma / rho_2))?;
            x0.assign_from(&x_1)?.assign_with(&w0, plus_mult_second(phi / rho0))?;
            iterations += 1;
            log::trace!("glsqr iter {}: |phi_hat| = {}", iterations, phi_hat.abs());

            if tau1 <= eps {
                breakdown = true;
                break Ok(());
            }
            self.monitor.next();
        };

        self.phi_hat = Some(phi_hat);
        match pc {
            Some(pc) => pc.apply(&x0, x)?,
            None => {
                x.assign_from(&x0)?;
            }
        }
        if breakdown {
            log::debug!("glsqr: recurrence broke down after {} iterations", iterations);
        }
        status?;
        let final_residual = phi_hat.abs();
        let converged = self.monitor.within_tolerance(final_residual);
        log::debug!(
            "glsqr: stopped after {} iterations, |phi_hat| = {}, converged = {}",
            iterations,
            final_residual,
            converged
        );
        Ok(SolveStats { iterations, final_residual, converged, breakdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::dense::DenseMatrix;
    use crate::preconditioner::Identity;
    use approx::assert_abs_diff_eq;

    fn solve_dense(a: &DenseMatrix<f64>, b: Vec<f64>, start: Vec<f64>) -> (DenseVector<f64>, SolveStats<f64>) {
        let mut solver = GlsqrSolver::new();
        let b = DenseVector::from(b);
        let mut x = DenseVector::from(start);
        let stats = solver.solve(a, None, &b, &mut x).unwrap();
        (x, stats)
    }

    #[test]
    fn identity_system() {
        let a = DenseMatrix::identity(4);
        let (x, stats) = solve_dense(&a, vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 0.0, 0.0, 0.0]);
        for (i, xi) in x.iter().enumerate() {
            assert_abs_diff_eq!(*xi, (i + 1) as f64, epsilon = 1e-10);
        }
        assert!(stats.iterations <= 4);
        assert!(stats.final_residual < 1e-8);
        assert!(stats.converged);
    }

    #[test]
    fn zero_start_falls_back_to_ones() {
        let a = DenseMatrix::identity(3);
        let (x, stats) = solve_dense(&a, vec![3.0, -1.0, 2.0], vec![0.0; 3]);
        assert_abs_diff_eq!(x[0], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], -1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[2], 2.0, epsilon = 1e-10);
        assert!(stats.converged);
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let a = DenseMatrix::identity(3);
        let (x, stats) = solve_dense(&a, vec![0.0; 3], vec![1.0, 2.0, 3.0]);
        assert_eq!(x.as_ref(), &[0.0, 0.0, 0.0]);
        assert_eq!(stats.iterations, 0);
        assert!(stats.converged);
    }

    #[test]
    fn rank_deficient_consistent_system_terminates() {
        let a = DenseMatrix::from_rows(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0]]).unwrap();
        let (x, stats) = solve_dense(&a, vec![1.0, 2.0, 0.0], vec![1.0, 1.0, 1.0]);
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[2], 0.0, epsilon = 1e-10);
        assert!(stats.breakdown || stats.converged);
    }

    #[test]
    fn inconsistent_singular_system_keeps_finite_iterate() {
        let a = DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let (x, stats) = solve_dense(&a, vec![1.0, 1.0], vec![1.0, 1.0]);
        assert!(stats.breakdown);
        assert!(x.iter().all(|v| v.is_finite()));
        let r = ((1.0 - x[0]).powi(2) + 1.0f64).sqrt();
        assert_abs_diff_eq!(stats.final_residual, r, epsilon = 1e-10);
    }

    #[test]
    fn overdetermined_least_squares() {
        let a = DenseMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let (x, _) = solve_dense(&a, vec![1.0, 2.0, 3.0], vec![1.0, 0.0]);
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn identity_preconditioner_changes_nothing() {
        let a = DenseMatrix::from_fn(5, 5, |i, j| if i == j { 4.0 } else { 1.0 / (1.0 + (i + j) as f64) });
        let b = DenseVector::from(vec![1.0, 0.0, -1.0, 2.0, 0.5]);
        let mut x1 = DenseVector::from(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let mut x2 = x1.clone();
        GlsqrSolver::new().solve(&a, None, &b, &mut x1).unwrap();
        let pc: &dyn Preconditioner<DenseMatrix<f64>, DenseVector<f64>> = &Identity;
        GlsqrSolver::new().solve(&a, Some(pc), &b, &mut x2).unwrap();
        for i in 0..5 {
            assert_abs_diff_eq!(x1[i], x2[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn rejects_bad_input() {
        let a = DenseMatrix::<f64>::identity(3);
        let mut solver = GlsqrSolver::new();
        let b = DenseVector::from(vec![1.0; 3]);
        let mut short = DenseVector::zeros(2);
        assert!(matches!(solver.solve(&a, None, &b, &mut short), Err(KError::ShapeMismatch(_))));
        let mut nan = DenseVector::from(vec![f64::NAN, 0.0, 0.0]);
        assert!(matches!(solver.solve(&a, None, &b, &mut nan), Err(KError::InvalidInput(_))));
        assert_eq!(solver.residual_norm(), None);
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let n = 30;
        let a = DenseMatrix::from_fn(n, n, |i, j| match (i as isize - j as isize).abs() {
            0 => 2.0,
            1 => -1.0,
            _ => 0.0,
        });
        let b = DenseVector::from_fn(n, |i| (i % 3) as f64);
        let mut x = DenseVector::from_fn(n, |i| if i == 0 { 1.0 } else { 0.0 });
        let mut solver = GlsqrSolver::with_tolerance(1e-14).with_max_iters(2);
        let err = solver.solve(&a, None, &b, &mut x).unwrap_err();
        assert!(matches!(err, KError::NotConverged { iterations: 2, .. }));
        assert!(solver.residual_norm().is_some());
    }
}
