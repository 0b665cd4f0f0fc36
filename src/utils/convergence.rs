//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! [`IterationMonitor`] is a small state machine driven by the solver loop:
//!
//! ```text
//! Uninitialized --set_first--> Iterating --converged(r)--> Converged
//!                                  |                    \-> Diverged
//!                                  \--next--> Iterating  \-> MaxIterationsExceeded
//! ```

use crate::error::{KError, NotConvergedReason};
use num_traits::Float;

/// Default relative tolerance.
pub const DEFAULT_REL_TOL: f64 = 1e-5;
/// Default absolute tolerance.
pub const DEFAULT_ABS_TOL: f64 = 1e-50;
/// Default divergence tolerance, relative to the initial residual.
pub const DEFAULT_DIV_TOL: f64 = 1e5;
/// Default iteration budget.
pub const DEFAULT_MAX_ITERS: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorState {
    Uninitialized,
    Iterating,
    Converged,
    Diverged,
    MaxIterationsExceeded,
}

/// Stopping criteria & iteration bookkeeping.
#[derive(Clone, Debug)]
pub struct IterationMonitor<R> {
    /// Relative tolerance; a negative value means "resolve to `sqrt(eps)` on first use".
    pub rel_tol: R,
    pub abs_tol: R,
    pub div_tol: R,
    pub max_iters: usize,
    iter: usize,
    initial_residual: R,
    last_residual: R,
    state: MonitorState,
}

impl<R: Float> Default for IterationMonitor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Float> IterationMonitor<R> {
    pub fn new() -> Self {
        Self {
            rel_tol: real(DEFAULT_REL_TOL),
            abs_tol: real(DEFAULT_ABS_TOL),
            div_tol: real(DEFAULT_DIV_TOL),
            max_iters: DEFAULT_MAX_ITERS,
            iter: 0,
            initial_residual: R::zero(),
            last_residual: R::zero(),
            state: MonitorState::Uninitialized,
        }
    }

    pub fn with_rel_tol(mut self, rel_tol: R) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Restarts the count at iteration zero.
    pub fn set_first(&mut self) {
        self.iter = 0;
        self.initial_residual = R::zero();
        self.last_residual = R::zero();
        self.state = MonitorState::Iterating;
    }

    /// Advances to the next iteration.
    pub fn next(&mut self) {
        self.iter += 1;
    }

    pub fn iterations(&self) -> usize {
        self.iter
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Residual reported at iteration zero.
    pub fn initial_residual(&self) -> R {
        self.initial_residual
    }

    pub fn last_residual(&self) -> R {
        self.last_residual
    }

    /// Resolves a negative relative tolerance to `sqrt(eps)`.
    fn resolve_rel_tol(&mut self) {
        if self.rel_tol < R::zero() {
            self.rel_tol = R::epsilon().sqrt();
        }
    }

    /// Convergence threshold `max(rel_tol · r₀, abs_tol)`.
    fn threshold(&self) -> R {
        (self.rel_tol * self.initial_residual).max(self.abs_tol)
    }

    /// Whether `r` would satisfy the tolerance, without changing any state.
    pub fn within_tolerance(&self, r: R) -> bool {
        let rel = if self.rel_tol < R::zero() { R::epsilon().sqrt() } else { self.rel_tol };
        let r0 = if self.state == MonitorState::Uninitialized { r } else { self.initial_residual };
        r.is_finite() && r <= (rel * r0).max(self.abs_tol)
    }

    /// Tests residual `r` for the current iteration.
    ///
    /// `Ok(true)` when converged, `Ok(false)` to keep iterating, and
    /// [`KError::NotConverged`] when the residual is non-finite, grew past
    /// `div_tol · r₀`, or the iteration budget is spent.
    pub fn converged(&mut self, r: R) -> Result<bool, KError> {
        if self.state == MonitorState::Uninitialized {
            self.set_first();
        }
        if self.iter == 0 {
            self.initial_residual = r;
            self.resolve_rel_tol();
        }
        self.last_residual = r;
        if !r.is_finite() {
            return Err(self.fail(MonitorState::Diverged, NotConvergedReason::NonFinite, r));
        }
        if r <= self.threshold() {
            self.state = MonitorState::Converged;
            return Ok(true);
        }
        if r > self.div_tol * self.initial_residual {
            return Err(self.fail(MonitorState::Diverged, NotConvergedReason::Divergence, r));
        }
        if self.iter >= self.max_iters {
            return Err(self.fail(MonitorState::MaxIterationsExceeded, NotConvergedReason::Iterations, r));
        }
        self.state = MonitorState::Iterating;
        Ok(false)
    }

    fn fail(&mut self, state: MonitorState, reason: NotConvergedReason, r: R) -> KError {
        self.state = state;
        log::debug!("iteration monitor stopped at {}: {} (residual {:?})", self.iter, reason, r.to_f64());
        KError::NotConverged {
            reason,
            iterations: self.iter,
            residual: r.to_f64().unwrap_or(f64::NAN),
        }
    }
}

fn real<R: Float>(v: f64) -> R {
    R::from(v).unwrap_or_else(R::zero)
}

/// Result of a solve.
#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    /// The recurrence stopped on a (near) zero normalization.
    pub breakdown: bool,
}

impl<T> SolveStats<T> {
    /// Stats of a solve that never iterated.
    pub fn trivial(final_residual: T) -> Self {
        Self { iterations: 0, final_residual, converged: true, breakdown: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_relative_to_first_residual() {
        let mut m = IterationMonitor::<f64>::new().with_rel_tol(1e-3);
        m.set_first();
        assert!(!m.converged(10.0).unwrap());
        m.next();
        assert!(!m.converged(0.1).unwrap());
        m.next();
        assert!(m.converged(0.009).unwrap());
        assert_eq!(m.state(), MonitorState::Converged);
        assert_eq!(m.iterations(), 2);
        assert_eq!(m.initial_residual(), 10.0);
    }

    #[test]
    fn zero_initial_residual_converges_immediately() {
        let mut m = IterationMonitor::<f64>::new();
        m.set_first();
        assert!(m.converged(0.0).unwrap());
    }

    #[test]
    fn negative_rel_tol_resolves_to_sqrt_eps() {
        let mut m = IterationMonitor::<f32>::new().with_rel_tol(-1.0);
        m.set_first();
        assert!(!m.converged(1.0).unwrap());
        assert_eq!(m.rel_tol, f32::EPSILON.sqrt());
    }

    #[test]
    fn max_iterations() {
        let mut m = IterationMonitor::<f64>::new().with_max_iters(2);
        m.set_first();
        for _ in 0..2 {
            assert!(!m.converged(1.0).unwrap());
            m.next();
        }
        let err = m.converged(1.0).unwrap_err();
        assert!(matches!(
            err,
            KError::NotConverged { reason: NotConvergedReason::Iterations, iterations: 2, .. }
        ));
        assert_eq!(m.state(), MonitorState::MaxIterationsExceeded);
    }

    #[test]
    fn divergence_and_nan() {
        let mut m = IterationMonitor::<f64>::new();
        m.set_first();
        m.converged(1.0).unwrap();
        m.next();
        assert!(matches!(
            m.converged(1e6),
            Err(KError::NotConverged { reason: NotConvergedReason::Divergence, .. })
        ));
        assert_eq!(m.state(), MonitorState::Diverged);

        let mut m = IterationMonitor::<f64>::new();
        assert!(matches!(
            m.converged(f64::NAN),
            Err(KError::NotConverged { reason: NotConvergedReason::NonFinite, .. })
        ));
    }

    #[test]
    fn within_tolerance_does_not_advance() {
        let mut m = IterationMonitor::<f64>::new().with_rel_tol(0.5);
        m.set_first();
        m.converged(4.0).unwrap();
        assert!(m.within_tolerance(2.0));
        assert!(!m.within_tolerance(2.5));
        assert_eq!(m.state(), MonitorState::Iterating);
        assert_eq!(m.last_residual(), 4.0);
    }
}
