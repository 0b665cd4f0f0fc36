//! Solver utilities.

pub mod convergence;

pub use convergence::{IterationMonitor, MonitorState, SolveStats};
