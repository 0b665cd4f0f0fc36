//! API options for the solver and its preconditioner.
//!
//! [`KspOptions`] configures the GLSQR iteration, [`PcOptions`] selects and
//! parameterizes the preconditioner. Both are plain data with defaults, so
//! callers override only what they need:
//!
//! ```rust
//! use krylith::config::options::{KspOptions, PcOptions};
//! let ksp = KspOptions { max_iters: 500, ..Default::default() };
//! let pc = PcOptions { pc_type: "ilut".into(), fill: 10, ..Default::default() };
//! assert_eq!(ksp.rel_tol, -1.0);
//! assert_eq!(pc.fill, 10);
//! ```

use crate::preconditioner::ilut::{DEFAULT_DROP_TOL, DEFAULT_FILL};
use crate::utils::convergence::DEFAULT_MAX_ITERS;

/// Krylov solver parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KspOptions {
    /// Relative tolerance; `-1` selects `sqrt(ε) · ‖Aᵗ b‖` for each solve.
    pub rel_tol: f64,
    pub max_iters: usize,
}

impl Default for KspOptions {
    fn default() -> Self {
        Self { rel_tol: -1.0, max_iters: DEFAULT_MAX_ITERS }
    }
}

/// Preconditioner types & parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PcOptions {
    /// Type of preconditioner (none, identity, ilut)
    pub pc_type: String,

    /// Relative drop tolerance for ILUT
    pub drop_tol: f64,

    /// Entries kept per row in each ILUT factor
    pub fill: usize,
}

impl Default for PcOptions {
    fn default() -> Self {
        Self { pc_type: "none".into(), drop_tol: DEFAULT_DROP_TOL, fill: DEFAULT_FILL }
    }
}
