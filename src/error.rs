use thiserror::Error;

// Unified error type for krylith

/// Why an iteration monitor gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotConvergedReason {
    /// The iteration budget was exhausted.
    Iterations,
    /// The residual grew past the divergence tolerance.
    Divergence,
    /// The residual became NaN or infinite.
    NonFinite,
}

impl std::fmt::Display for NotConvergedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotConvergedReason::Iterations => "iteration limit reached",
            NotConvergedReason::Divergence => "residual diverged",
            NotConvergedReason::NonFinite => "residual is not finite",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum KError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: (usize, usize), shape: (usize, usize) },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not converged after {iterations} iterations ({reason}), residual {residual:e}")]
    NotConverged {
        reason: NotConvergedReason,
        iterations: usize,
        residual: f64,
    },
    #[error("view outlived its backing storage")]
    DetachedView,
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl KError {
    /// Out-of-bounds error for a vector index.
    pub(crate) fn out_of_bounds_1d(index: usize, size: usize) -> Self {
        KError::IndexOutOfBounds { index: (index, 0), shape: (size, 1) }
    }

    pub(crate) fn out_of_bounds_2d(i: usize, j: usize, rows: usize, cols: usize) -> Self {
        KError::IndexOutOfBounds { index: (i, j), shape: (rows, cols) }
    }
}
