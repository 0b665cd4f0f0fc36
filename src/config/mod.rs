//! Solver and preconditioner options.

pub mod options;
pub use options::{KspOptions, PcOptions};
