//! Preconditioner context and configuration for Krylov solvers.
//!
//! The `PC` enum names a preconditioner and its parameters; [`PC::build`]
//! turns it into a boxed [`Preconditioner`] ready for `setup`.
//!
//! # Example
//!
//! ```rust
//! use krylith::context::pc_context::PC;
//! let pc = PC::Ilut { fill: 10, droptol: 1e-3 };
//! assert_eq!(pc.name(), "ilut");
//! ```

use crate::config::options::PcOptions;
use crate::core::scalar::Scalar;
use crate::core::traits::Matrix2D;
use crate::error::KError;
use crate::matrix::vector::DenseVector;
use crate::preconditioner::{Identity, Ilut, Preconditioner};
use num_traits::Float;

/// Supported preconditioner types.
#[derive(Debug, Clone, PartialEq)]
pub enum PC<T> {
    /// No preconditioning.
    None,
    /// `M = I`.
    Identity,
    /// Incomplete LU factorization with threshold-based dropping (ILUT).
    ///
    /// - `fill`: Maximum number of off-diagonal entries per row in each factor.
    /// - `droptol`: Drop tolerance relative to the row norm.
    Ilut { fill: usize, droptol: T },
}

impl<T: Scalar + Float> PC<T> {
    /// Reads `pc_type` (`none`, `identity` or `ilut`, case-insensitive).
    pub fn from_options(opts: &PcOptions) -> Result<Self, KError> {
        match opts.pc_type.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(PC::None),
            "identity" => Ok(PC::Identity),
            "ilut" => {
                let droptol = T::from_f64(opts.drop_tol)
                    .ok_or_else(|| KError::InvalidInput(format!("drop tolerance {} not representable", opts.drop_tol)))?;
                Ok(PC::Ilut { fill: opts.fill, droptol })
            }
            other => Err(KError::InvalidInput(format!("unknown preconditioner type '{}'", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PC::None => "none",
            PC::Identity => "identity",
            PC::Ilut { .. } => "ilut",
        }
    }

    /// The preconditioner object, `None` for [`PC::None`]. Not yet set up.
    pub fn build<M>(&self) -> Option<Box<dyn Preconditioner<M, DenseVector<T>>>>
    where
        M: Matrix2D<T>,
    {
        match *self {
            PC::None => None,
            PC::Identity => Some(Box::new(Identity)),
            PC::Ilut { fill, droptol } => Some(Box::new(Ilut::new(fill, droptol))),
        }
    }
}

impl<T> Default for PC<T> {
    fn default() -> Self {
        PC::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;

    #[test]
    fn parses_options() {
        let opts = PcOptions { pc_type: "ILUT".into(), drop_tol: 1e-4, fill: 7 };
        assert_eq!(PC::<f64>::from_options(&opts).unwrap(), PC::Ilut { fill: 7, droptol: 1e-4 });
        assert_eq!(PC::<f64>::from_options(&PcOptions::default()).unwrap(), PC::None);
        let bad = PcOptions { pc_type: "sor".into(), ..Default::default() };
        assert!(matches!(PC::<f64>::from_options(&bad), Err(KError::InvalidInput(_))));
    }

    #[test]
    fn builds_objects() {
        assert!(PC::<f64>::None.build::<DenseMatrix<f64>>().is_none());
        let mut pc = PC::<f64>::Identity.build::<DenseMatrix<f64>>().unwrap();
        pc.setup(&DenseMatrix::identity(2)).unwrap();
        let r = DenseVector::from(vec![1.0, 2.0]);
        let mut z = DenseVector::zeros(2);
        pc.apply(&r, &mut z).unwrap();
        assert_eq!(z, r);
    }
}
