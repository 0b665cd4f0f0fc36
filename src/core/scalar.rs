//! Element types supported by every storage layout.
//!
//! Storage is generic over `f32`, `f64`, `i32` and `i64`. Norms of integer
//! data are computed in `f64`, so each scalar names the floating type its
//! magnitudes live in.

use num_traits::{Float, FromPrimitive, Num, NumCast, ToPrimitive};
use std::fmt::{Debug, Display};

/// A numeric element that can be stored in a vector or matrix.
pub trait Scalar:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + Debug
    + Display
    + Num
    + NumCast
    + FromPrimitive
    + ToPrimitive
    + Send
    + Sync
    + 'static
{
    /// Floating type used for norms of this element type.
    type Real: Float + FromPrimitive + Debug + Display + Send + Sync + 'static;

    /// Converts the element into its real type.
    fn to_real(self) -> Self::Real;

    /// True for NaN or infinite values. Integers are always finite.
    fn is_non_finite(self) -> bool;
}

macro_rules! impl_float_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            type Real = $t;
            #[inline]
            fn to_real(self) -> $t {
                self
            }
            #[inline]
            fn is_non_finite(self) -> bool {
                !self.is_finite()
            }
        }
    )*};
}

macro_rules! impl_int_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            type Real = f64;
            #[inline]
            fn to_real(self) -> f64 {
                self as f64
            }
            #[inline]
            fn is_non_finite(self) -> bool {
                false
            }
        }
    )*};
}

impl_float_scalar!(f32, f64);
impl_int_scalar!(i32, i64);
