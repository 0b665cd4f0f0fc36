//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait, the no-op [`Identity`] and
//! the threshold incomplete LU factorization [`Ilut`].

use crate::error::KError;

/// A preconditioner M ≈ A.
///
/// `apply` computes `z = M⁻¹ r`; solvers that also work with `Aᵗ` (GLSQR)
/// need `apply_transpose`, which computes `z = M⁻ᵗ r`.
pub trait Preconditioner<M, V> {
    /// Setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> {
        Ok(())
    }
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Apply M⁻ᵗ to r, writing z = M⁻ᵗ r
    fn apply_transpose(&self, r: &V, z: &mut V) -> Result<(), KError>;
}

/// `M = I`: both applications copy `r` into `z`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<M, V: Clone> Preconditioner<M, V> for Identity {
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError> {
        z.clone_from(r);
        Ok(())
    }

    fn apply_transpose(&self, r: &V, z: &mut V) -> Result<(), KError> {
        z.clone_from(r);
        Ok(())
    }
}

pub mod ilut;
pub use ilut::Ilut;
